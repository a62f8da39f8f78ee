//! Per-peer throttling for the anonymous and credential-checking routes.
//!
//! Keys are the socket peer address from `ConnectInfo`; forwarding headers
//! are never consulted, so a caller cannot mint new buckets by rewriting them.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, HeaderValue, Response, StatusCode};
use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor, GovernorError,
    GovernorLayer,
};

use crate::config::Config;

pub type PeerRateLimiter = GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware, Body>;

/// Throttles `POST /api/chat/sessions`.
pub fn create_session_rate_limiter(config: &Config) -> PeerRateLimiter {
    peer_rate_limiter(
        config.session_create_limit,
        config.session_create_window_secs,
    )
}

/// Throttles `POST /api/admin/login`.
pub fn create_login_rate_limiter(config: &Config) -> PeerRateLimiter {
    peer_rate_limiter(config.login_limit, config.login_window_secs)
}

fn peer_rate_limiter(burst_size: u32, window_seconds: u64) -> PeerRateLimiter {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .period(Duration::from_secs(window_seconds.max(1)))
            .burst_size(burst_size.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("rate limiter config should be valid"),
    );

    GovernorLayer::new(governor_conf).error_handler(rate_limit_error_handler)
}

fn rate_limit_error_handler(error: GovernorError) -> Response<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            tracing::warn!(wait_time, "Rate limit exceeded");
            let mut response = json_error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Too many requests. Please try again later.",
                Some(wait_time),
            );
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            tracing::error!("Rate limiter could not read the peer address");
            json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "rate_limit_key_error",
                "Unable to determine request identity.",
                None,
            )
        }
        GovernorError::Other { code, msg, headers } => {
            let mut response = json_error_response(
                code,
                "rate_limit_error",
                &msg.unwrap_or_else(|| "Rate limit error".to_string()),
                None,
            );
            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            response
        }
    }
}

fn json_error_response(
    status: StatusCode,
    error: &str,
    message: &str,
    retry_after: Option<u64>,
) -> Response<Body> {
    let mut body = serde_json::json!({
        "error": error,
        "message": message,
    });
    if let Some(retry_after) = retry_after {
        body["retry_after"] = retry_after.into();
    }

    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(retry_after) = retry_after {
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert("retry-after", value);
        }
    }
    response
}
