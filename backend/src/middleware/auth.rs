use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{services::AdminIdentity, state::AppState};

const TOKEN_QUERY_PARAM: &str = "access_token";

/// Requires a valid admin token. The resolved [`AdminIdentity`] is inserted
/// as a request extension.
///
/// Browsers cannot set headers on WebSocket upgrades, so the token is also
/// accepted as an `access_token` query parameter.
pub async fn auth_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_token(&request).ok_or(StatusCode::UNAUTHORIZED)?;
    let identity: AdminIdentity = state.authenticator.verify(&token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected admin token");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn extract_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(|value| value.to_string())
        .or_else(|| request.uri().query().and_then(query_token))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

fn query_token(query: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
