//! Session Routes
//!
//! 定义会话相关的 API 路由。

use crate::api::handlers::session_handler::*;
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::api::app_state::AppState;

/// 创建会话路由器
pub fn create_session_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/session/start", post(start_session))
        .route("/session/history/:token", get(get_history))
        .route("/session/clear/:token", delete(clear_session))
}
