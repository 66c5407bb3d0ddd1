//! Web 服务器模块
//!
//! 同时运行两个监听器：控制界面（启停、配置测试、模型列表）和翻译接口。

pub mod config;
pub mod handlers;
pub mod routes;
pub mod types;

pub use config::*;
pub use handlers::*;
pub use routes::*;
pub use types::*;

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::translation::{
    ConfigStore, HistoryLog, TranslationCache, TranslationError, TranslationService, UpstreamConfig,
};

/// Web 服务器错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] io::Error),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// Web 服务器
pub struct WebServer {
    config: WebConfig,
    service: Arc<TranslationService>,
}

impl WebServer {
    /// 创建新的 Web 服务器，并从快照文件加载缓存
    pub fn new(config: WebConfig, upstream: UpstreamConfig) -> Result<Self, ServerError> {
        let cache = TranslationCache::load(config.cache_file.clone());

        let history = HistoryLog::with_capacity(config.history_limit);
        let service = TranslationService::new(ConfigStore::new(upstream), cache, history)?;

        Ok(Self {
            config,
            service: Arc::new(service),
        })
    }

    pub fn service(&self) -> &Arc<TranslationService> {
        &self.service
    }

    /// 启动 Web 服务器，收到 Ctrl-C 后退出并写入最后一次快照
    pub async fn start(&self) -> Result<(), ServerError> {
        let app_state = Arc::new(AppState::new(Arc::clone(&self.service)));

        let control_app = create_control_router(Arc::clone(&app_state), &self.config);
        let translate_app = create_translate_router(app_state);

        let control_listener = bind(&self.config.control_address()).await?;
        let translate_listener = bind(&self.config.translate_address()).await?;

        tracing::info!(
            "Control surface starting at http://{}",
            self.config.control_address()
        );
        tracing::info!(
            "Translation service starting at http://{}",
            self.config.translate_address()
        );

        if let Some(path) = self.service.cache().path() {
            tracing::info!(
                "翻译缓存每 {} 秒写入 {}",
                self.config.flush_interval.as_secs(),
                path.display()
            );
        }
        let snapshot_task = Arc::clone(self.service.cache())
            .spawn_snapshot_task(self.config.flush_interval);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("收到退出信号，正在关闭服务");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    tracing::error!("无法监听退出信号: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        });

        let control = axum::serve(control_listener, control_app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
            .into_future();
        let translate = axum::serve(translate_listener, translate_app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .into_future();

        let (control_result, translate_result) = tokio::join!(control, translate);

        snapshot_task.abort();
        if self.service.flush_cache().await {
            tracing::info!("退出前已保存翻译缓存");
        }

        control_result?;
        translate_result?;
        Ok(())
    }
}

async fn bind(address: &str) -> Result<tokio::net::TcpListener, ServerError> {
    tokio::net::TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// 创建控制界面路由器
pub fn create_control_router(app_state: Arc<AppState>, config: &WebConfig) -> Router {
    let mut app = create_control_routes().with_state(app_state);

    // 添加静态文件服务（如果配置了）
    if let Some(static_dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    // 添加CORS支持
    app.layer(CorsLayer::permissive())
}

/// 创建翻译接口路由器
pub fn create_translate_router(app_state: Arc<AppState>) -> Router {
    create_translate_routes()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}
