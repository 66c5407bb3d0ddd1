//! 翻译模块
//!
//! 接收游戏端发来的短文本，转发给 OpenAI 兼容的聊天补全接口，清理回复后返回：
//! - **config**: 上游接口配置，整体替换
//! - **sanitizer**: 去除推理标记、限制长度
//! - **cache**: 原文精确匹配缓存与定期快照
//! - **history**: 内存中的翻译历史
//! - **upstream**: 聊天补全客户端与失败分类
//! - **discovery**: 模型列表探测
//! - **lifecycle**: 服务启停开关
//! - **service**: 把以上组件串起来的请求处理
//! - **error**: 错误类型
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use llm_translate_relay::translation::{
//!     ConfigPatch, ConfigStore, HistoryLog, TranslationCache, TranslationService,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TranslationService::new(
//!     ConfigStore::default(),
//!     TranslationCache::load("translationResult.json"),
//!     HistoryLog::new(),
//! )?;
//! service.start(&ConfigPatch::default());
//! let translation = service.translate("hello world").await?;
//! println!("{}", translation.text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod sanitizer;
pub mod service;
pub mod upstream;

pub use cache::TranslationCache;
pub use config::{ConfigPatch, ConfigStore, UpstreamConfig};
pub use discovery::ModelProber;
pub use error::{TranslationError, TranslationResult};
pub use history::{HistoryEntry, HistoryLog};
pub use lifecycle::{LifecycleOutcome, ServiceLifecycle, ServiceState};
pub use sanitizer::sanitize;
pub use service::{ConfigTestReport, StatsSnapshot, Timeouts, Translation, TranslationService};
pub use upstream::{chat_endpoint, UpstreamClient};
