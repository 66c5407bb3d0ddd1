//! OpenAI 兼容的聊天补全客户端
//!
//! 负责请求构造、超时控制以及把各种失败归类到 [`TranslationError`]。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translation::config::constants::CHAT_COMPLETIONS_SUFFIX;
use crate::translation::error::{helpers, truncate_for_diagnostics, TranslationError, TranslationResult};

/// 补全聊天接口路径
///
/// 仅在缺少 `/chat/completions` 后缀时追加，重复调用结果不变。
pub fn chat_endpoint(api_url: &str) -> String {
    let trimmed = api_url.trim().trim_end_matches('/');
    if trimmed.ends_with(CHAT_COMPLETIONS_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, CHAT_COMPLETIONS_SUFFIX)
    }
}

/// 聊天消息
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn system(content: &'a str) -> Self {
        Self { role: "system", content }
    }

    pub fn user(content: &'a str) -> Self {
        Self { role: "user", content }
    }
}

/// 聊天补全请求体
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// 上游报告的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// 成功的补全结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// 第一个 choice 的原始内容，尚未清理
    pub content: String,
    pub usage: Option<Usage>,
}

/// 上游 HTTP 客户端
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new() -> TranslationResult<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| helpers::internal_error(format!("创建HTTP客户端失败: {}", e)))?;
        Ok(Self { http })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// 发送聊天补全请求
    ///
    /// 超时由 reqwest 按请求控制，超时后连接随 future 一起被释放。
    pub async fn chat_completion(
        &self,
        api_url: &str,
        api_key: &str,
        request: &ChatRequest<'_>,
        timeout: Duration,
    ) -> TranslationResult<ChatCompletion> {
        let endpoint = chat_endpoint(api_url);
        tracing::debug!(
            "正在发送请求到 {} (Temperature: {}, Max Tokens: {})",
            endpoint,
            request.temperature,
            request.max_tokens
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("API 请求失败，状态码: {}", status.as_u16());
            return Err(TranslationError::UpstreamError {
                status: status.as_u16(),
                body: truncate_for_diagnostics(&body),
            });
        }

        let body = response.text().await.map_err(classify_request_error)?;
        parse_completion(&body)
    }
}

/// 从响应体中提取第一个 choice 的内容
pub fn parse_completion(body: &str) -> TranslationResult<ChatCompletion> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        TranslationError::UpstreamMalformedResponse(format!(
            "{} ({})",
            e,
            truncate_for_diagnostics(body)
        ))
    })?;

    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslationError::UpstreamMalformedResponse(truncate_for_diagnostics(body)))?;

    let usage = value
        .get("usage")
        .and_then(|usage| serde_json::from_value::<Usage>(usage.clone()).ok());

    Ok(ChatCompletion {
        content: content.to_string(),
        usage,
    })
}

/// 将 reqwest 错误归类
pub(crate) fn classify_request_error(error: reqwest::Error) -> TranslationError {
    if error.is_timeout() {
        TranslationError::UpstreamTimeout
    } else if error.is_connect() {
        TranslationError::UpstreamUnreachable(error.to_string())
    } else {
        helpers::internal_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_endpoint_appends_suffix() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://example.com/v1/chat/completions"),
            "https://example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_chat_endpoint_is_idempotent() {
        for url in [
            "http://localhost:8000",
            "http://localhost:8000/",
            "http://localhost:8000/v1/chat/completions",
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
        ] {
            let once = chat_endpoint(url);
            assert_eq!(chat_endpoint(&once), once);
        }
    }

    #[test]
    fn test_request_has_two_turns() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage::system("prompt"), ChatMessage::user("hello world")],
            temperature: 1.0,
            max_tokens: 4096,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello world");
        assert_eq!(json["max_tokens"], 4096);
    }

    #[test]
    fn test_parse_completion_extracts_content_and_usage() {
        let body = r#"{"choices":[{"message":{"content":"你好"}}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.content, "你好");
        assert_eq!(completion.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_parse_completion_allows_empty_content() {
        let completion = parse_completion(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap();
        assert_eq!(completion.content, "");
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_parse_completion_rejects_malformed_bodies() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{}}]}"#,
            r#"{"choices":[{"message":{"content":42}}]}"#,
            r#"{"error":"quota"}"#,
        ] {
            assert!(matches!(
                parse_completion(body),
                Err(TranslationError::UpstreamMalformedResponse(_))
            ));
        }
    }
}
