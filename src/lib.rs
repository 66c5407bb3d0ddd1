//! # LLM Translate Relay
//!
//! 把游戏翻译插件发来的短文本转发给 OpenAI 兼容的聊天补全接口，
//! 并缓存、记录翻译结果。
//!
//! ## 模块组织
//!
//! - `translation` - 翻译核心：配置、缓存、历史记录、上游调用、模型探测
//! - `env` - 类型安全的环境变量
//! - `web` - 控制界面与翻译接口两个 HTTP 服务

pub mod env;
pub mod translation;
pub mod web;
