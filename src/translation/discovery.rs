//! 模型列表探测
//!
//! 不同的 OpenAI 兼容服务把模型列表放在不同的路径、用不同的结构返回。
//! 这里按固定顺序尝试三个候选地址，并用一组有序的结构匹配器解析响应。

use std::time::Duration;

use serde_json::Value;

use crate::translation::config::constants::{CHAT_COMPLETIONS_SUFFIX, MODEL_PROBE_TIMEOUT};
use crate::translation::error::{helpers, truncate_for_diagnostics, TranslationError, TranslationResult};
use crate::translation::upstream::{chat_endpoint, UpstreamClient};

/// 条目缺少标识时使用的占位名称
pub const UNKNOWN_MODEL: &str = "unknown model";

/// 结构匹配器：识别成功时返回模型名称列表
pub type ShapeMatcher = fn(&Value) -> Option<Vec<String>>;

/// 按顺序尝试的结构匹配器
pub const SHAPE_MATCHERS: &[(&str, ShapeMatcher)] = &[
    ("data", match_data),
    ("models", match_models),
    ("model_list", match_model_list),
];

/// `{ "data": [{ "id": .. }] }`，OpenAI 风格
pub fn match_data(value: &Value) -> Option<Vec<String>> {
    extract_names(value, "data", &["id"])
}

/// `{ "models": [{ "id" | "name": .. }] }`
pub fn match_models(value: &Value) -> Option<Vec<String>> {
    extract_names(value, "models", &["id", "name"])
}

/// `{ "model_list": [{ "model_name" | "name": .. }] }`
pub fn match_model_list(value: &Value) -> Option<Vec<String>> {
    extract_names(value, "model_list", &["model_name", "name"])
}

fn extract_names(value: &Value, field: &str, keys: &[&str]) -> Option<Vec<String>> {
    let entries = value.get(field)?.as_array()?;
    Some(
        entries
            .iter()
            .map(|entry| {
                keys.iter()
                    .find_map(|key| entry.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
                    .unwrap_or(UNKNOWN_MODEL)
                    .to_string()
            })
            .collect(),
    )
}

/// 依次应用结构匹配器
pub fn match_shape(value: &Value) -> Option<Vec<String>> {
    SHAPE_MATCHERS.iter().find_map(|(name, matcher)| {
        let models = matcher(value)?;
        tracing::debug!("模型列表结构匹配: {}", name);
        Some(models)
    })
}

/// 三个候选的模型列表地址，按尝试顺序排列
pub fn candidate_urls(api_url: &str) -> [String; 3] {
    let chat_url = chat_endpoint(api_url);
    let base = chat_url
        .strip_suffix(CHAT_COMPLETIONS_SUFFIX)
        .unwrap_or(&chat_url);

    [
        format!("{}/models", base),
        format!("{}/v1/models", base),
        chat_url.replacen(CHAT_COMPLETIONS_SUFFIX, "/models", 1),
    ]
}

/// 最近一次探测失败的诊断信息
#[derive(Debug, Clone, Default, PartialEq)]
struct ProbeFailure {
    status: Option<u16>,
    body: Option<String>,
    message: Option<String>,
}

impl ProbeFailure {
    fn into_error(self) -> TranslationError {
        let mut detail = String::from("所有已知API端点尝试均失败");
        if let Some(status) = self.status {
            detail.push_str(&format!(", HTTP 状态码: {}", status));
        }
        if let Some(ref body) = self.body {
            detail.push_str(&format!(", 错误详情: {}", body));
        }
        if let Some(ref message) = self.message {
            detail.push_str(&format!(", 错误信息: {}", message));
        }
        TranslationError::ModelDiscoveryFailed {
            status: self.status,
            detail,
        }
    }
}

/// 模型列表探测器
#[derive(Clone)]
pub struct ModelProber {
    client: UpstreamClient,
    timeout: Duration,
}

impl ModelProber {
    pub fn new(client: UpstreamClient) -> Self {
        Self::with_timeout(client, MODEL_PROBE_TIMEOUT)
    }

    pub fn with_timeout(client: UpstreamClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// 获取模型名称列表
    ///
    /// 在第一个返回 200 且结构可识别的候选地址处停止，不做额外重试。
    pub async fn list_models(&self, api_url: &str, api_key: &str) -> TranslationResult<Vec<String>> {
        if api_url.trim().is_empty() {
            return Err(helpers::config_error("API URL不能为空"));
        }
        if api_key.trim().is_empty() {
            return Err(helpers::config_error("API Key不能为空"));
        }

        let mut last_failure = ProbeFailure::default();
        for endpoint in candidate_urls(api_url) {
            tracing::info!("正在尝试模型列表 API 端点: {}", endpoint);
            match self.probe(&endpoint, api_key).await {
                Ok(models) => {
                    tracing::info!("成功获取模型列表，共 {} 个模型", models.len());
                    return Ok(models);
                }
                Err(failure) => last_failure = failure,
            }
        }

        tracing::error!("无法获取模型列表，所有已知API端点尝试均失败");
        Err(last_failure.into_error())
    }

    async fn probe(&self, endpoint: &str, api_key: &str) -> Result<Vec<String>, ProbeFailure> {
        let response = self
            .client
            .http()
            .get(endpoint)
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("请求模型列表出错: {}", e);
                ProbeFailure {
                    message: Some(e.to_string()),
                    ..Default::default()
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ProbeFailure {
            status: Some(status),
            message: Some(e.to_string()),
            ..Default::default()
        })?;

        if status != 200 {
            tracing::debug!("请求失败，状态码: {}", status);
            return Err(ProbeFailure {
                status: Some(status),
                body: Some(truncate_for_diagnostics(&body)),
                message: None,
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| ProbeFailure {
            message: Some(format!("无法解析的API响应: {}", e)),
            body: Some(truncate_for_diagnostics(&body)),
            ..Default::default()
        })?;

        match_shape(&value).ok_or_else(|| {
            tracing::debug!("无法识别的API响应格式: {}", truncate_for_diagnostics(&body));
            ProbeFailure {
                message: Some("无法识别的API响应格式".to_string()),
                body: Some(truncate_for_diagnostics(&body)),
                ..Default::default()
            }
        })
    }
}
