use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    error::AppError,
    models::admin::{LoginRequest, LoginResponse},
    services::AuthError,
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let authenticator = state.authenticator.clone();
    let LoginRequest { username, password } = payload;
    let grant = tokio::task::spawn_blocking(move || authenticator.authenticate(&username, &password))
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
        .map_err(|err| match err {
            AuthError::InvalidCredentials | AuthError::NotConfigured | AuthError::InvalidToken => {
                AppError::Unauthorized("Invalid username or password".to_string())
            }
            AuthError::Internal(err) => AppError::InternalServerError(err),
        })?;

    Ok(Json(LoginResponse {
        access_token: grant.access_token,
        token_type: "Bearer".to_string(),
        expires_at: grant.claims.expires_at(),
    }))
}
