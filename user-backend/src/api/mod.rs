// user-backend/src/api/mod.rs
use crate::config::AppConfig;
use crate::logging::request_span_middleware;
use crate::middleware::cors_layer;
use crate::service::auth_service::AuthService;
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod handlers;

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

/// 全ルートとミドルウェアを組み立てる
pub fn build_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config);

    handlers::auth_handler::auth_router(app_state)
        .layer(middleware::from_fn(request_span_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
