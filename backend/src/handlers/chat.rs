//! Public chat endpoints used by the visitor widget.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{ChatMessage, ChatSession, NewMessage, SendMessageRequest, Sender, SessionStatus},
    state::AppState,
    types::SessionId,
};

pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ChatSession>), AppError> {
    let session = state.chat.create_session(&state.config.guest_name).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(state.chat.require_session(session_id).await?))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    state.chat.require_session(session_id).await?;
    Ok(Json(state.chat.list_messages(session_id).await?))
}

/// Visitors may only write once an expert has joined.
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    payload.validate()?;
    let session = state.chat.require_session(session_id).await?;
    if session.status != SessionStatus::Connected {
        return Err(AppError::Conflict(format!(
            "Messages can only be sent while connected (session is {})",
            session.status
        )));
    }
    let message = NewMessage::new(session_id, Sender::User, &payload.content)
        .map_err(|e| AppError::Validation(vec![format!("content: {}", e.code)]))?;
    let stored = state.chat.send_message(message).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<ChatSession>, AppError> {
    let outcome = state.chat.close_session(session_id).await?;
    Ok(Json(outcome.session().clone()))
}
