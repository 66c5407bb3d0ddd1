//! Web 服务器配置
//!
//! 使用类型安全的环境变量系统进行配置管理

use std::path::PathBuf;
use std::time::Duration;

use crate::env::{EnvError, EnvResult, EnvVar};
use crate::translation::config::constants;

/// Web 服务器配置
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// 绑定地址
    pub bind_addr: String,
    /// 控制界面端口
    pub control_port: u16,
    /// 翻译服务端口
    pub translate_port: u16,
    /// 静态文件目录
    pub static_dir: Option<String>,
    /// 缓存快照文件
    pub cache_file: PathBuf,
    /// 快照间隔
    pub flush_interval: Duration,
    /// 历史记录上限，0 表示不限制
    pub history_limit: usize,
}

impl WebConfig {
    /// 从环境变量创建配置
    pub fn from_env() -> EnvResult<Self> {
        use crate::env::{cache, web};

        let static_dir_str = web::StaticDir::get()?;
        let static_dir = if static_dir_str.is_empty() {
            None
        } else {
            Some(static_dir_str)
        };

        Ok(Self {
            bind_addr: web::BindAddress::get()?,
            control_port: web::ControlPort::get()?,
            translate_port: web::TranslatePort::get()?,
            static_dir,
            cache_file: PathBuf::from(cache::CacheFile::get()?),
            flush_interval: cache::FlushInterval::get()?,
            history_limit: cache::HistoryLimit::get()?,
        })
    }

    /// 验证配置
    pub fn validate(&self) -> EnvResult<()> {
        if self.bind_addr.is_empty() {
            return Err(EnvError {
                variable: "RELAY_BIND_ADDRESS".to_string(),
                message: "Bind address cannot be empty".to_string(),
            });
        }

        if self.control_port == 0 || self.translate_port == 0 {
            return Err(EnvError {
                variable: "PORT".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if self.control_port == self.translate_port {
            return Err(EnvError {
                variable: "PORT".to_string(),
                message: format!(
                    "Control and translation surfaces cannot share port {}",
                    self.control_port
                ),
            });
        }

        if self.flush_interval.is_zero() {
            return Err(EnvError {
                variable: "RELAY_CACHE_FLUSH_INTERVAL".to_string(),
                message: "Flush interval must be at least one second".to_string(),
            });
        }

        // 验证静态文件目录（如果设置）
        if let Some(ref static_dir) = self.static_dir {
            let path = std::path::Path::new(static_dir);
            if !path.exists() {
                tracing::warn!("Static directory '{}' does not exist", static_dir);
            }
        }

        Ok(())
    }

    /// 控制界面监听地址
    pub fn control_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.control_port)
    }

    /// 翻译服务监听地址
    pub fn translate_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.translate_port)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Failed to load web config from environment: {}. Using defaults.", e);
            Self {
                bind_addr: "127.0.0.1".to_string(),
                control_port: 6799,
                translate_port: 6800,
                static_dir: None,
                cache_file: PathBuf::from(constants::DEFAULT_CACHE_FILE),
                flush_interval: constants::DEFAULT_FLUSH_INTERVAL,
                history_limit: 0,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebConfig {
        WebConfig {
            bind_addr: "127.0.0.1".to_string(),
            control_port: 6799,
            translate_port: 6800,
            static_dir: None,
            cache_file: PathBuf::from("translationResult.json"),
            flush_interval: Duration::from_secs(10),
            history_limit: 0,
        }
    }

    #[test]
    fn test_addresses() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_address(), "127.0.0.1:6799");
        assert_eq!(config.translate_address(), "127.0.0.1:6800");
    }

    #[test]
    fn test_shared_port_rejected() {
        let mut config = config();
        config.translate_port = config.control_port;
        assert!(config.validate().is_err());
    }
}
