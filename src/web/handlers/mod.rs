//! Web 路由处理器
//!
//! 控制界面返回 JSON，翻译接口返回纯文本。错误到状态码的映射集中在这里。

pub mod control;
pub mod translate;

pub use control::*;
pub use translate::*;

use axum::http::StatusCode;

use crate::translation::TranslationError;

/// 翻译错误对应的 HTTP 状态码
pub fn status_for(error: &TranslationError) -> StatusCode {
    match error {
        TranslationError::ServiceNotStarted => StatusCode::SERVICE_UNAVAILABLE,
        TranslationError::InputTooShort | TranslationError::ConfigIncomplete(_) => {
            StatusCode::BAD_REQUEST
        }
        TranslationError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        TranslationError::UpstreamUnreachable(_) | TranslationError::UpstreamError { .. } => {
            StatusCode::BAD_GATEWAY
        }
        TranslationError::UpstreamMalformedResponse(_)
        | TranslationError::ModelDiscoveryFailed { .. }
        | TranslationError::Persistence(_)
        | TranslationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 配置测试沿用上游返回的错误状态码
pub fn config_test_status_for(error: &TranslationError) -> StatusCode {
    if let TranslationError::UpstreamError { status, .. } = error {
        if let Ok(code) = StatusCode::from_u16(*status) {
            if code.is_client_error() || code.is_server_error() {
                return code;
            }
        }
    }
    status_for(error)
}
