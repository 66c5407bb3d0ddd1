//! 翻译接口处理器

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};

use super::status_for;
use crate::web::types::{AppState, HistoryResponse, TranslateQuery};

/// 翻译 `text` 参数
///
/// 成功时返回纯文本译文，失败时返回纯文本错误信息。
pub async fn translate_text(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranslateQuery>,
) -> (StatusCode, String) {
    let text = query.text.unwrap_or_default();

    match state.service.translate(&text).await {
        Ok(translation) => (StatusCode::OK, translation.text),
        Err(e) => (status_for(&e), format!("翻译失败: {}", e)),
    }
}

/// 翻译历史，最新的在前
pub async fn translation_history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        success: true,
        history: state.service.history(),
    })
}
