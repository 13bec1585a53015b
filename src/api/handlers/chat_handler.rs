use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::chat_dto::*},
    error::AppError,
};

/// 处理一条 HTTP 查询
///
/// 未携带令牌时创建新会话；携带的令牌无效时返回 401，空查询返回 400。
pub async fn chat_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let session_token = match request.session_token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => {
            let token = state.sessions.create().await?;
            state.observability.metrics.record_session_created();
            debug!("Minted session {} for query", token);
            token
        }
    };

    let outcome = state
        .pipeline
        .process(&session_token, &request.query)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::Authentication("Invalid session token".to_string())
            } else {
                e
            }
        })?;
    state.observability.metrics.record_query(outcome.is_fallback());

    Ok(Json(QueryResponse {
        session_token,
        answer: outcome.answer,
    }))
}
