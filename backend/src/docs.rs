#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    models::{
        admin::{LoginRequest, LoginResponse},
        ChatMessage, ChatSession, SendMessageRequest, Sender, SessionStatus,
    },
    services::ChangeEvent,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_doc,
        get_session_doc,
        list_messages_doc,
        send_message_doc,
        close_session_doc,
        session_events_doc,
        admin_login_doc,
        admin_list_sessions_doc,
        admin_claim_session_doc,
        admin_list_messages_doc,
        admin_send_message_doc,
        admin_close_session_doc,
        admin_events_doc
    ),
    components(
        schemas(
            ChatSession,
            SessionStatus,
            ChatMessage,
            Sender,
            SendMessageRequest,
            ChangeEvent,
            LoginRequest,
            LoginResponse,
            ErrorResponse
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "Chat", description = "Visitor support chat"),
        (name = "Admin", description = "Admin console: session list, claims and replies")
    ),
    security(("BearerAuth" = []))
)]
pub struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_string());

        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

#[utoipa::path(
    post,
    path = "/api/chat/sessions",
    responses(
        (status = 201, description = "Session created in the waiting state", body = ChatSession),
        (status = 429, description = "Too many sessions requested from this client"),
        (status = 503, description = "Chat store unavailable or not migrated", body = ErrorResponse)
    ),
    tag = "Chat",
    security(())
)]
fn create_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, body = ChatSession),
        (status = 404, body = ErrorResponse)
    ),
    tag = "Chat",
    security(())
)]
fn get_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}/messages",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 200, description = "Messages ordered by creation time", body = [ChatMessage])),
    tag = "Chat",
    security(())
)]
fn list_messages_doc() {}

#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/messages",
    params(("id" = String, Path, description = "Session id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, body = ChatMessage),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 409, description = "Session is not connected", body = ErrorResponse)
    ),
    tag = "Chat",
    security(())
)]
fn send_message_doc() {}

#[utoipa::path(
    post,
    path = "/api/chat/sessions/{id}/close",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 200, body = ChatSession)),
    tag = "Chat",
    security(())
)]
fn close_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}/events",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 101, description = "WebSocket of status and message changes", body = ChangeEvent)),
    tag = "Chat",
    security(())
)]
fn session_events_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, body = ErrorResponse)
    ),
    tag = "Admin",
    security(())
)]
fn admin_login_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/chat/sessions",
    responses((status = 200, description = "Waiting and connected sessions, newest first", body = [ChatSession])),
    tag = "Admin"
)]
fn admin_list_sessions_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/chat/sessions/{id}/claim",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, body = ChatSession),
        (status = 409, description = "Already claimed or closed", body = ErrorResponse)
    ),
    tag = "Admin"
)]
fn admin_claim_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/chat/sessions/{id}/messages",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 200, body = [ChatMessage])),
    tag = "Admin"
)]
fn admin_list_messages_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/chat/sessions/{id}/messages",
    params(("id" = String, Path, description = "Session id")),
    request_body = SendMessageRequest,
    responses((status = 201, body = ChatMessage)),
    tag = "Admin"
)]
fn admin_send_message_doc() {}

#[utoipa::path(
    post,
    path = "/api/admin/chat/sessions/{id}/close",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 200, body = ChatSession)),
    tag = "Admin"
)]
fn admin_close_session_doc() {}

#[utoipa::path(
    get,
    path = "/api/admin/chat/events",
    responses((status = 101, description = "WebSocket of session inserts and updates", body = ChangeEvent)),
    tag = "Admin"
)]
fn admin_events_doc() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_chat_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/chat/sessions"));
        assert!(doc.paths.paths.contains_key("/api/admin/chat/sessions/{id}/claim"));
        let components = doc.components.expect("components");
        assert!(components.schemas.contains_key("ChatSession"));
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
