use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{docs::ApiDoc, handlers, middleware, state::AppState};

/// Builds the full HTTP surface: visitor routes, admin routes and API docs.
pub fn build_router(state: AppState) -> Router {
    // Session creation is anonymous, so it is rate limited per peer address.
    let session_create_routes = Router::new()
        .route("/api/chat/sessions", post(handlers::chat::create_session))
        .route_layer(middleware::create_session_rate_limiter(&state.config));

    let visitor_routes = Router::new()
        .route("/api/chat/sessions/{id}", get(handlers::chat::get_session))
        .route(
            "/api/chat/sessions/{id}/messages",
            get(handlers::chat::list_messages).post(handlers::chat::send_message),
        )
        .route(
            "/api/chat/sessions/{id}/close",
            post(handlers::chat::close_session),
        )
        .route(
            "/api/chat/sessions/{id}/events",
            get(handlers::events::session_events),
        );

    let public_routes = Router::new()
        .route("/api/admin/login", post(handlers::auth::login))
        .route_layer(middleware::create_login_rate_limiter(&state.config));

    let admin_routes = Router::new()
        .route(
            "/api/admin/chat/sessions",
            get(handlers::admin::list_active_sessions),
        )
        .route(
            "/api/admin/chat/sessions/{id}/claim",
            post(handlers::admin::claim_session),
        )
        .route(
            "/api/admin/chat/sessions/{id}/messages",
            get(handlers::admin::list_messages).post(handlers::admin::send_message),
        )
        .route(
            "/api/admin/chat/sessions/{id}/close",
            post(handlers::admin::close_session),
        )
        .route("/api/admin/chat/events", get(handlers::events::admin_events))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_admin,
        ));

    Router::new()
        .merge(session_create_routes)
        .merge(visitor_routes)
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(middleware::log_error_responses))
        .layer(axum_middleware::from_fn(middleware::request_id))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
}
