//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。上游相关变量沿用 `.env` 中的原有名称。

use std::env;
use std::fmt;
use std::time::Duration;

use crate::translation::config::constants;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "RELAY_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid log level '{}'. Use: trace, debug, info, warn, error", value),
                }),
            }
        }
    }
}

/// 上游接口相关环境变量
pub mod upstream {
    use super::*;

    /// API 基础地址
    pub struct ApiBaseUrl;
    impl EnvVar<String> for ApiBaseUrl {
        const NAME: &'static str = "API_BASE_URL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(constants::DEFAULT_API_URL.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Chat-completion API base URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// API 密钥
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "API_KEY";
        const DEFAULT: Option<String> = None;

        // 允许为空，启动服务时由界面提交
        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(String::new()),
            }
        }
        const DESCRIPTION: &'static str = "Chat-completion API key";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }

    /// 模型名称
    pub struct ModelName;
    impl EnvVar<String> for ModelName {
        const NAME: &'static str = "MODEL_NAME";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(constants::DEFAULT_MODEL_NAME.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Model name sent with every request";

        fn parse(value: &str) -> EnvResult<String> {
            let name = value.trim();
            if name.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Model name cannot be empty".to_string(),
                });
            }
            Ok(name.to_string())
        }
    }

    /// 系统提示词
    pub struct SystemPrompt;
    impl EnvVar<String> for SystemPrompt {
        const NAME: &'static str = "SYSTEM_PROMPT";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(constants::DEFAULT_SYSTEM_PROMPT.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "System prompt of the translation request";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.to_string())
        }
    }

    /// 采样温度
    pub struct Temperature;
    impl EnvVar<f64> for Temperature {
        const NAME: &'static str = "TEMPERATURE";
        const DEFAULT: Option<f64> = Some(constants::DEFAULT_TEMPERATURE);
        const DESCRIPTION: &'static str = "Sampling temperature (0.0 - 2.0)";

        fn parse(value: &str) -> EnvResult<f64> {
            let temperature: f64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number".to_string(),
            })?;

            if !(0.0..=2.0).contains(&temperature) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Temperature must be between 0.0 and 2.0".to_string(),
                });
            }

            Ok(temperature)
        }
    }

    /// 回复最大 token 数
    pub struct MaxTokens;
    impl EnvVar<u32> for MaxTokens {
        const NAME: &'static str = "MAX_TOKENS";
        const DEFAULT: Option<u32> = Some(constants::DEFAULT_MAX_TOKENS);
        const DESCRIPTION: &'static str = "Maximum output tokens per reply";

        fn parse(value: &str) -> EnvResult<u32> {
            parse_ranged_u64(value, Self::NAME, 1, u32::MAX as u64).map(|v| v as u32)
        }
    }
}

/// Web服务器相关环境变量
pub mod web {
    use super::*;

    /// 绑定地址
    pub struct BindAddress;
    impl EnvVar<String> for BindAddress {
        const NAME: &'static str = "RELAY_BIND_ADDRESS";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("127.0.0.1".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Bind address of both listeners";

        fn parse(value: &str) -> EnvResult<String> {
            let addr = value.trim();
            if addr.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Address cannot be empty".to_string(),
                });
            }
            Ok(addr.to_string())
        }
    }

    /// 控制界面端口
    pub struct ControlPort;
    impl EnvVar<u16> for ControlPort {
        const NAME: &'static str = "WEB_UI_PORT";
        const DEFAULT: Option<u16> = Some(6799);
        const DESCRIPTION: &'static str = "Port of the control/config surface";

        fn parse(value: &str) -> EnvResult<u16> {
            parse_port(value, Self::NAME)
        }
    }

    /// 翻译服务端口
    pub struct TranslatePort;
    impl EnvVar<u16> for TranslatePort {
        const NAME: &'static str = "PORT";
        const DEFAULT: Option<u16> = Some(6800);
        const DESCRIPTION: &'static str = "Port of the translation surface";

        fn parse(value: &str) -> EnvResult<u16> {
            parse_port(value, Self::NAME)
        }
    }

    /// 静态文件目录
    pub struct StaticDir;
    impl EnvVar<String> for StaticDir {
        const NAME: &'static str = "RELAY_STATIC_DIR";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(String::new()),
            }
        }
        const DESCRIPTION: &'static str = "Directory served on the control surface (empty = disabled)";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(value.trim().to_string())
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存快照文件
    pub struct CacheFile;
    impl EnvVar<String> for CacheFile {
        const NAME: &'static str = "RELAY_CACHE_FILE";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(constants::DEFAULT_CACHE_FILE.to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Path of the translation cache snapshot";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Cache file path cannot be empty".to_string(),
                });
            }
            Ok(path.to_string())
        }
    }

    /// 快照间隔
    pub struct FlushInterval;
    impl EnvVar<Duration> for FlushInterval {
        const NAME: &'static str = "RELAY_CACHE_FLUSH_INTERVAL";
        const DEFAULT: Option<Duration> = Some(constants::DEFAULT_FLUSH_INTERVAL);
        const DESCRIPTION: &'static str = "Cache snapshot interval in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_ranged_u64(value, Self::NAME, 1, 3600).map(Duration::from_secs)
        }
    }

    /// 历史记录上限
    pub struct HistoryLimit;
    impl EnvVar<usize> for HistoryLimit {
        const NAME: &'static str = "RELAY_HISTORY_LIMIT";
        const DEFAULT: Option<usize> = Some(0);
        const DESCRIPTION: &'static str = "Maximum history entries kept in memory (0 = unbounded)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_ranged_u64(value, Self::NAME, 0, 1_000_000).map(|v| v as usize)
        }
    }
}

/// 辅助函数
fn parse_port(value: &str, var_name: &str) -> EnvResult<u16> {
    let port: u16 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid port number (1-65535)".to_string(),
    })?;

    if port == 0 {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Port cannot be 0".to_string(),
        });
    }

    Ok(port)
}

fn parse_ranged_u64(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<u64> {
    let num: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid non-negative number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    // 核心配置
    pub log_level: String,

    // 上游配置
    pub api_base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: u32,

    // Web配置
    pub bind_address: String,
    pub control_port: u16,
    pub translate_port: u16,
    pub static_dir: String,

    // 缓存配置
    pub cache_file: String,
    pub flush_interval: Duration,
    pub history_limit: usize,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get()?,

            api_base_url: upstream::ApiBaseUrl::get()?,
            api_key: upstream::ApiKey::get()?,
            model_name: upstream::ModelName::get()?,
            temperature: upstream::Temperature::get()?,
            max_tokens: upstream::MaxTokens::get()?,

            bind_address: web::BindAddress::get()?,
            control_port: web::ControlPort::get()?,
            translate_port: web::TranslatePort::get()?,
            static_dir: web::StaticDir::get()?,

            cache_file: cache::CacheFile::get()?,
            flush_interval: cache::FlushInterval::get()?,
            history_limit: cache::HistoryLimit::get()?,
        })
    }

    /// 验证配置
    pub fn validate(&self) -> EnvResult<()> {
        if self.control_port == self.translate_port {
            return Err(EnvError {
                variable: web::TranslatePort::NAME.to_string(),
                message: format!(
                    "Translation port must differ from {} ({})",
                    web::ControlPort::NAME,
                    self.control_port
                ),
            });
        }
        Ok(())
    }

    /// 记录配置摘要（隐藏敏感信息）
    pub fn print_summary(&self) {
        tracing::info!("Environment Configuration Summary:");
        tracing::info!("  Log Level: {}", self.log_level);
        tracing::info!("  Upstream: {} (model {})", self.api_base_url, self.model_name);
        if !self.api_key.is_empty() {
            tracing::info!("  API Key: [configured]");
        }
        tracing::info!(
            "  Listeners: control {}:{}, translation {}:{}",
            self.bind_address,
            self.control_port,
            self.bind_address,
            self.translate_port
        );
        tracing::info!(
            "  Cache: {} (flush every {}s)",
            self.cache_file,
            self.flush_interval.as_secs()
        );
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    push_doc::<core::LogLevel, String>(&mut docs);

    docs.push_str("\n## Upstream Configuration\n\n");
    push_doc::<upstream::ApiBaseUrl, String>(&mut docs);
    push_doc::<upstream::ApiKey, String>(&mut docs);
    push_doc::<upstream::ModelName, String>(&mut docs);
    push_doc::<upstream::SystemPrompt, String>(&mut docs);
    push_doc::<upstream::Temperature, f64>(&mut docs);
    push_doc::<upstream::MaxTokens, u32>(&mut docs);

    docs.push_str("\n## Web Server Configuration\n\n");
    push_doc::<web::BindAddress, String>(&mut docs);
    push_doc::<web::ControlPort, u16>(&mut docs);
    push_doc::<web::TranslatePort, u16>(&mut docs);
    push_doc::<web::StaticDir, String>(&mut docs);

    docs.push_str("\n## Cache Configuration\n\n");
    push_doc::<cache::CacheFile, String>(&mut docs);
    push_doc::<cache::FlushInterval, Duration>(&mut docs);
    push_doc::<cache::HistoryLimit, usize>(&mut docs);

    docs
}

fn push_doc<V: EnvVar<T>, T: fmt::Debug>(docs: &mut String) {
    docs.push_str(&format!("- `{}`: {} (default: {:?})\n", V::NAME, V::DESCRIPTION, V::DEFAULT));
}
