//! WebSocket Handler Module
//!
//! Live chat channel: one inbound text frame is one query, answered with one
//! JSON `{role: "bot", content}` frame. The session token is passed as the
//! `token` query parameter and checked once when the connection opens.

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::api::app_state::AppState;
use crate::api::dto::chat_dto::ChatSocketParams;
use crate::models::chat::ChatMessage;

/// Sent when a frame cannot be processed at all
pub const FRAME_ERROR_ANSWER: &str = "An error occurred";

const INVALID_TOKEN_REASON: &str = "Invalid or expired session token";

/// WebSocket handler using Axum's WebSocket support
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ChatSocketParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.token))
}

/// Returns the token when it names a live session
async fn validate_token(state: &AppState, token: Option<String>) -> Option<String> {
    let token = token.filter(|t| !t.is_empty())?;
    match state.sessions.exists(&token).await {
        Ok(true) => Some(token),
        Ok(false) => None,
        Err(e) => {
            error!("Failed to validate WebSocket session {}: {}", token, e);
            None
        }
    }
}

/// Handle the WebSocket connection
async fn handle_socket(mut socket: WebSocket, state: AppState, token: Option<String>) {
    let Some(token) = validate_token(&state, token).await else {
        debug!("Rejecting WebSocket connection with invalid token");
        let close = Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: INVALID_TOKEN_REASON.into(),
        }));
        if let Err(e) = socket.send(close).await {
            debug!("Failed to send close frame: {}", e);
        }
        return;
    };

    info!("WebSocket connected for session {}", token);
    state.observability.metrics.ws_connected();

    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let (frame, failed) = match answer_frame(&state, &token, &text).await {
                    Ok(frame) => (frame, false),
                    Err(frame) => (frame, true),
                };
                if let Err(e) = sender.send(Message::Text(frame)).await {
                    debug!("Failed to send answer to {}: {}", token, e);
                    break;
                }
                // 处理失败后结束连接
                if failed {
                    let close = Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "".into(),
                    }));
                    if let Err(e) = sender.send(close).await {
                        debug!("Failed to send close frame to {}: {}", token, e);
                    }
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Client initiated close for {}", token);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for {}: {}", token, e);
                break;
            }
        }
    }

    state.observability.metrics.ws_disconnected();
    info!("WebSocket disconnected for session {}", token);
}

/// Run one query and encode the bot frame
///
/// `Err` carries the error frame; the connection ends after it is sent.
async fn answer_frame(
    state: &AppState,
    token: &str,
    query: &str,
) -> std::result::Result<String, String> {
    let outcome = match state.pipeline.process(token, query).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed to process WebSocket query for {}: {}", token, e);
            return Err(encode_frame(&ChatMessage::bot(FRAME_ERROR_ANSWER)));
        }
    };

    state.observability.metrics.record_query(outcome.is_fallback());
    Ok(encode_frame(&ChatMessage::bot(outcome.answer)))
}

fn encode_frame(message: &ChatMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        error!("Failed to encode answer frame: {}", e);
        format!(r#"{{"role":"bot","content":"{}"}}"#, FRAME_ERROR_ANSWER)
    })
}
