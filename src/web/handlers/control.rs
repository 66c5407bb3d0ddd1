//! 控制界面 API 处理器

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Json as ExtractJson, State},
    http::StatusCode,
    response::Json,
};

use super::{config_test_status_for, status_for};
use crate::translation::{ConfigPatch, TranslationError};
use crate::web::types::{
    AppState, HealthResponse, MessageResponse, ModelsRequest, ModelsResponse, StatsResponse,
    TestConfigResponse,
};

type ApiError = (StatusCode, Json<MessageResponse>);

fn api_error(status: StatusCode, prefix: &str, error: &TranslationError) -> ApiError {
    (status, Json(MessageResponse::failed(format!("{}: {}", prefix, error))))
}

/// 无法解析的请求体同样以 JSON 返回
fn bad_body(prefix: &str, detail: impl std::fmt::Display) -> ApiError {
    tracing::warn!("{}: 请求体无效: {}", prefix, detail);
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse::failed(format!("{}: 请求体无效: {}", prefix, detail))),
    )
}

fn json_body<T>(prefix: &str, body: Result<ExtractJson<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|ExtractJson(value)| value)
        .map_err(|rejection| bad_body(prefix, rejection.body_text()))
}

/// 启动翻译服务
///
/// 请求体为空时沿用当前配置；请求体无法解析时拒绝启动。
pub async fn start_service(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let patch = if body.iter().all(u8::is_ascii_whitespace) {
        ConfigPatch::default()
    } else {
        serde_json::from_slice::<ConfigPatch>(&body).map_err(|e| bad_body("启动失败", e))?
    };

    if state.service.start(&patch).is_accepted() {
        Ok(Json(MessageResponse::ok("翻译服务已启动")))
    } else {
        Ok(Json(MessageResponse::failed("翻译服务已在运行中，请勿重复启动")))
    }
}

/// 停止翻译服务
pub async fn stop_service(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if state.service.stop().is_accepted() {
        Json(MessageResponse::ok("翻译服务已停止"))
    } else {
        Json(MessageResponse::failed("翻译服务未在运行，无法停止"))
    }
}

/// 测试上游配置
pub async fn test_config(
    State(state): State<Arc<AppState>>,
    body: Result<ExtractJson<ConfigPatch>, JsonRejection>,
) -> Result<Json<TestConfigResponse>, ApiError> {
    let patch = json_body("错误", body)?;

    match state.service.test_config(&patch).await {
        Ok(report) => Ok(Json(TestConfigResponse {
            success: true,
            message: format!("API响应成功！回复内容: {}", report.content),
            content: report.content,
            usage: report.usage,
        })),
        Err(e) => {
            tracing::error!("测试配置出错: {}", e);
            Err(api_error(config_test_status_for(&e), "错误", &e))
        }
    }
}

/// 获取上游模型列表
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    body: Result<ExtractJson<ModelsRequest>, JsonRejection>,
) -> Result<Json<ModelsResponse>, ApiError> {
    let request = json_body("获取模型列表失败", body)?;
    let api_url = request.api_url.unwrap_or_default();
    let api_key = request.api_key.unwrap_or_default();

    match state.service.list_models(&api_url, &api_key).await {
        Ok(models) => Ok(Json(ModelsResponse {
            success: true,
            message: format!("成功获取模型列表，共 {} 个模型", models.len()),
            models,
        })),
        Err(e) => Err(api_error(status_for(&e), "获取模型列表失败", &e)),
    }
}

/// 清空翻译历史，缓存保持不变
pub async fn clear_history(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.service.clear_history();
    tracing::info!("翻译历史已清空");
    Json(MessageResponse::ok("翻译历史已清空"))
}

/// 运行统计
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.service.stats(),
    })
}

/// 健康检查
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Web Server is running".to_string(),
    })
}
