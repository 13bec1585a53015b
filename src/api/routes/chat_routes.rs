//! Chat Routes

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;
use crate::api::handlers::chat_handler::chat_query;
use crate::websocket::chat_ws_handler;

/// 创建聊天路由器
pub fn create_chat_router() -> Router<AppState> {
    Router::new()
        .route("/chat/query", post(chat_query))
        .route("/chat/ws", get(chat_ws_handler))
}
