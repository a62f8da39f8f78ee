//! Admin console endpoints. Every route here sits behind `auth_admin`.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{ChatMessage, ChatSession, NewMessage, SendMessageRequest, Sender},
    services::{AdminIdentity, ClaimOutcome},
    state::AppState,
    types::SessionId,
};

pub async fn list_active_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatSession>>, AppError> {
    Ok(Json(state.chat.list_active_sessions().await?))
}

/// Conditional claim: only one admin gets `200`, the rest get `409`.
pub async fn claim_session(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<ChatSession>, AppError> {
    match state.chat.claim_session(session_id).await? {
        ClaimOutcome::Claimed(session) => {
            tracing::info!(session_id = %session_id, admin = %admin.username, "Admin claimed session");
            Ok(Json(session))
        }
        ClaimOutcome::AlreadyClaimed(_) => Err(AppError::Conflict(
            "Session was already claimed by another admin".to_string(),
        )),
        ClaimOutcome::Closed(_) => Err(AppError::Conflict("Session is closed".to_string())),
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    state.chat.require_session(session_id).await?;
    Ok(Json(state.chat.list_messages(session_id).await?))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    payload.validate()?;
    let message = NewMessage::new(session_id, Sender::Expert, &payload.content)
        .map_err(|e| AppError::Validation(vec![format!("content: {}", e.code)]))?;
    let stored = state.chat.send_message(message).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn close_session(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<ChatSession>, AppError> {
    let outcome = state.chat.close_session(session_id).await?;
    tracing::info!(session_id = %session_id, admin = %admin.username, "Admin closed session");
    Ok(Json(outcome.session().clone()))
}
