//! Web 路由定义

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::web::{handlers::*, types::AppState};

/// 控制界面路由
pub fn create_control_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(start_service))
        .route("/stop", post(stop_service))
        .route("/test-config", post(test_config))
        .route("/models", post(list_models))
        .route("/clear-history", post(clear_history))
        .route("/stats", get(stats))
        .route("/health", get(health))
        // 向后兼容的旧路径
        .route("/start-server", post(start_service))
        .route("/stop-server", post(stop_service))
}

/// 翻译接口路由
pub fn create_translate_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(translate_text))
        .route("/history", get(translation_history))
}
