//! 上游接口配置
//!
//! 进程内只保存一份配置，重新配置时整体替换，读者不会看到合并到一半的值。

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Deserializer, Serialize};

use crate::env::{upstream, EnvResult, EnvVar};
use crate::translation::error::{helpers, TranslationResult};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    /// 聊天补全路径后缀
    pub const CHAT_COMPLETIONS_SUFFIX: &str = "/chat/completions";

    /// 输入文本最少字符数（去除首尾空白后）
    pub const MIN_INPUT_CHARS: usize = 2;

    // 默认上游设置
    pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL_NAME: &str = "qwen-plus";
    pub const DEFAULT_TEMPERATURE: f64 = 1.0;
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;
    pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个游戏翻译模型，可以流畅通顺地将任意的游戏文本翻译成简体中文，并联系上下文正确使用人称代词，不要进行任何额外的格式修改，不擅自添加原文中没有的代词。你的回答只有翻译文本！不允许回答翻译文本之外的内容！不允许解释你是怎么样翻译的！如果游戏文本是一个字母或符号回答原文本即可！";

    // 超时设置
    pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(180);
    pub const CONFIG_TEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MODEL_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

    // 缓存快照
    pub const DEFAULT_CACHE_FILE: &str = "translationResult.json";
    pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
}

/// 上游聊天补全接口配置
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl UpstreamConfig {
    /// 从环境变量创建配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            api_url: upstream::ApiBaseUrl::get()?,
            api_key: upstream::ApiKey::get()?,
            model_name: upstream::ModelName::get()?,
            system_prompt: upstream::SystemPrompt::get()?,
            temperature: upstream::Temperature::get()?,
            max_tokens: upstream::MaxTokens::get()?,
        })
    }

    /// 检查发起上游调用所需的字段
    pub fn validate(&self) -> TranslationResult<()> {
        if self.api_url.trim().is_empty() {
            return Err(helpers::config_error("API URL不能为空"));
        }
        if self.api_key.trim().is_empty() {
            return Err(helpers::config_error("API Key不能为空"));
        }
        if self.model_name.trim().is_empty() {
            return Err(helpers::config_error("模型名称不能为空"));
        }
        Ok(())
    }

    /// 将补丁中出现的字段覆盖到当前配置上
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(ref api_url) = patch.api_url {
            next.api_url = api_url.clone();
        }
        if let Some(ref api_key) = patch.api_key {
            next.api_key = api_key.clone();
        }
        if let Some(ref model_name) = patch.model_name {
            next.model_name = model_name.clone();
        }
        if let Some(ref system_prompt) = patch.system_prompt {
            next.system_prompt = system_prompt.clone();
        }
        if let Some(temperature) = patch.temperature {
            next.temperature = temperature;
        }
        if let Some(max_tokens) = patch.max_tokens {
            next.max_tokens = max_tokens;
        }
        next
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Failed to load upstream config from environment: {}. Using defaults.", e);
            Self {
                api_url: constants::DEFAULT_API_URL.to_string(),
                api_key: String::new(),
                model_name: constants::DEFAULT_MODEL_NAME.to_string(),
                system_prompt: constants::DEFAULT_SYSTEM_PROMPT.to_string(),
                temperature: constants::DEFAULT_TEMPERATURE,
                max_tokens: constants::DEFAULT_MAX_TOKENS,
            }
        })
    }
}

// 密钥不进入日志
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[configured]" })
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// 部分配置，来自界面提交的表单
///
/// 数值字段既可以是 JSON 数字也可以是数字字符串，无法解析时视为未提供。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub max_tokens: Option<u32>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.filter(|v| v.is_finite()))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|v| v.is_finite() && *v >= 1.0)
        .map(|v| v.min(u32::MAX as f64) as u32))
}

/// 配置存储
pub struct ConfigStore {
    current: RwLock<Arc<UpstreamConfig>>,
}

impl ConfigStore {
    pub fn new(initial: UpstreamConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// 获取当前配置的快照
    pub fn get(&self) -> Arc<UpstreamConfig> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// 合并补丁并整体替换，返回合并后的完整配置
    ///
    /// 不做校验，使用方在发起调用前自行检查。
    pub fn replace(&self, patch: &ConfigPatch) -> UpstreamConfig {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = guard.merged(patch);
        *guard = Arc::new(next.clone());
        next
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(UpstreamConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UpstreamConfig {
        UpstreamConfig {
            api_url: "http://localhost:8000/v1".to_string(),
            api_key: "sk-test".to_string(),
            model_name: "m".to_string(),
            system_prompt: "translate".to_string(),
            temperature: 1.0,
            max_tokens: 4096,
        }
    }

    #[test]
    fn test_replace_merges_only_supplied_fields() {
        let store = ConfigStore::new(sample());
        let patch = ConfigPatch {
            model_name: Some("qwen-max".to_string()),
            temperature: Some(0.3),
            ..Default::default()
        };

        let merged = store.replace(&patch);
        assert_eq!(merged.model_name, "qwen-max");
        assert_eq!(merged.temperature, 0.3);
        assert_eq!(merged.api_key, "sk-test");
        assert_eq!(*store.get(), merged);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_replace() {
        let store = ConfigStore::new(sample());
        let before = store.get();
        store.replace(&ConfigPatch {
            api_url: Some("http://other".to_string()),
            ..Default::default()
        });
        assert_eq!(before.api_url, "http://localhost:8000/v1");
        assert_eq!(store.get().api_url, "http://other");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        assert!(sample().validate().is_ok());

        let mut config = sample();
        config.api_key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(crate::translation::error::TranslationError::ConfigIncomplete(_))
        ));

        let mut config = sample();
        config.model_name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_patch_accepts_numeric_strings() {
        let patch: ConfigPatch = serde_json::from_str(
            r#"{"api_url":"http://x","temperature":"0.7","max_tokens":"2048"}"#,
        )
        .unwrap();
        assert_eq!(patch.temperature, Some(0.7));
        assert_eq!(patch.max_tokens, Some(2048));

        let patch: ConfigPatch =
            serde_json::from_str(r#"{"temperature":"warm","max_tokens":0}"#).unwrap();
        assert_eq!(patch.temperature, None);
        assert_eq!(patch.max_tokens, None);
        assert_eq!(patch.api_url, None);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("[configured]"));
    }
}
