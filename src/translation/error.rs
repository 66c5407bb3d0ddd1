//! 翻译模块统一错误处理
//!
//! 每种失败都对应一个独立的变体，Web 层据此映射 HTTP 状态码。

use std::fmt;

use thiserror::Error;

/// 诊断信息中保留的上游响应体最大字符数
pub const DIAGNOSTIC_BODY_LIMIT: usize = 200;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 服务处于停止状态
    #[error("翻译服务未启动")]
    ServiceNotStarted,

    /// 输入文本去除空白后少于两个字符
    #[error("输入文本太短")]
    InputTooShort,

    /// 缺少 API 地址、密钥或模型名称
    #[error("API配置不完整: {0}")]
    ConfigIncomplete(String),

    /// 上游请求超时
    #[error("API请求超时")]
    UpstreamTimeout,

    /// 无法连接到上游服务器
    #[error("无法连接到API服务器: {0}")]
    UpstreamUnreachable(String),

    /// 上游返回非 2xx 状态码
    #[error("API返回错误码 {status}: {body}")]
    UpstreamError { status: u16, body: String },

    /// 上游响应缺少 choices[0].message.content
    #[error("API返回无效的响应结构: {0}")]
    UpstreamMalformedResponse(String),

    /// 所有模型列表端点均失败
    #[error("无法获取模型列表: {detail}")]
    ModelDiscoveryFailed { status: Option<u16>, detail: String },

    /// 缓存文件读写失败
    #[error("缓存持久化错误: {0}")]
    Persistence(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    ///
    /// 核心层从不自动重试，该标记只供调用方参考。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslationError::UpstreamTimeout | TranslationError::UpstreamUnreachable(_)
        )
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ServiceNotStarted => ErrorSeverity::Info,
            TranslationError::InputTooShort => ErrorSeverity::Info,
            TranslationError::ConfigIncomplete(_) => ErrorSeverity::Warning,
            TranslationError::UpstreamTimeout => ErrorSeverity::Warning,
            TranslationError::UpstreamUnreachable(_) => ErrorSeverity::Warning,
            TranslationError::UpstreamError { .. } => ErrorSeverity::Error,
            TranslationError::UpstreamMalformedResponse(_) => ErrorSeverity::Error,
            TranslationError::ModelDiscoveryFailed { .. } => ErrorSeverity::Error,
            TranslationError::Persistence(_) => ErrorSeverity::Warning,
            TranslationError::Internal(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ServiceNotStarted
            | TranslationError::InputTooShort
            | TranslationError::ConfigIncomplete(_) => ErrorCategory::Client,
            TranslationError::UpstreamTimeout | TranslationError::UpstreamUnreachable(_) => {
                ErrorCategory::Transient
            }
            TranslationError::UpstreamError { .. }
            | TranslationError::UpstreamMalformedResponse(_)
            | TranslationError::ModelDiscoveryFailed { .. } => ErrorCategory::Semantic,
            TranslationError::Persistence(_) => ErrorCategory::Persistence,
            TranslationError::Internal(_) => ErrorCategory::Internal,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 输入或配置问题，不会重试
    Client,
    /// 超时、连接失败
    Transient,
    /// 上游返回了错误或无法识别的内容
    Semantic,
    Persistence,
    Internal,
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::Persistence(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::Persistence(format!("JSON序列化错误: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 截断诊断文本，避免把整个上游响应塞进错误信息
pub fn truncate_for_diagnostics(text: &str) -> String {
    truncate_chars(text, DIAGNOSTIC_BODY_LIMIT)
}

/// 按字符截断（不会切断多字节字符），超长时追加省略号
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }

    /// 创建配置不完整错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigIncomplete(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::Internal(msg.to_string())
    }
}
