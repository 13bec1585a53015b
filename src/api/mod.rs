//! API 模块
//!
//! 提供 REST 与 WebSocket 接口。

pub mod app_state;
pub mod dto;
pub mod handlers;
pub mod routes;

use crate::api::app_state::AppState;
use crate::config::config::ServerConfig;
use crate::observability::{create_observability_router, metrics_middleware};
use crate::security::middleware::security_headers_middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: AppState, server: &ServerConfig) -> Router {
    let observability = app_state.observability.clone();

    let api = Router::new()
        .merge(routes::session_routes::create_session_router())
        .merge(routes::chat_routes::create_chat_router())
        .with_state(app_state);

    let cors = if server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    api.merge(create_observability_router(observability.clone()))
        .layer(axum::middleware::from_fn_with_state(
            observability,
            metrics_middleware,
        ))
        // Add security headers middleware to all routes
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
