use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{debug, info};

use crate::{
    api::{app_state::AppState, dto::session_dto::*},
    error::AppError,
};

pub async fn root() -> impl IntoResponse {
    Json(BannerResponse {
        message: "News Chatbot Backend is running!".to_string(),
    })
}

pub async fn start_session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session_token = state.sessions.create().await?;
    state.observability.metrics.record_session_created();
    info!("Started session {}", session_token);

    Ok(Json(SessionStartResponse { session_token }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Getting history for session {}", token);

    let history = state.sessions.get_history(&token).await?;
    Ok(Json(HistoryResponse { history }))
}

pub async fn clear_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.clear(&token).await?;
    info!("Cleared session {}", token);

    Ok(Json(ClearResponse::cleared()))
}
