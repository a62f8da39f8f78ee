use axum::http::{Method, StatusCode};
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceExt;

use printdesk_backend::{
    config::Config,
    services::{ChatStore, InjectedFailure},
    types::SessionId,
};

mod support;

use support::{json_request, json_request_from, test_config, TestApp};

#[tokio::test]
async fn create_session_starts_waiting_as_guest() {
    let app = TestApp::new();
    let body = app.create_session().await;

    assert_eq!(body["status"], "waiting");
    assert_eq!(body["user_name"], "Guest User");
    let id: SessionId = body["id"].as_str().unwrap().parse().unwrap();
    assert!(app.store.find_session(id).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_and_malformed_session_ids() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/chat/sessions/{}", SessionId::new()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .request(Method::GET, "/api/chat/sessions/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visitor_cannot_write_before_connected() {
    let app = TestApp::new();
    let session = app.create_session().await;
    let uri = format!("/api/chat/sessions/{}/messages", session["id"].as_str().unwrap());

    let (status, body) = app
        .request(Method::POST, &uri, Some(json!({"content": "hello?"})), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("waiting"));
}

#[tokio::test]
async fn whitespace_message_is_rejected_before_store() {
    let app = TestApp::new();
    let session = app.create_session().await;
    let id: SessionId = session["id"].as_str().unwrap().parse().unwrap();
    app.chat.claim_session(id).await.unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/chat/sessions/{}/messages", id),
            Some(json!({"content": "   \n "})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(app.store.list_messages(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn connected_visitor_messages_come_back_in_order() {
    let app = TestApp::new();
    let session = app.create_session().await;
    let id: SessionId = session["id"].as_str().unwrap().parse().unwrap();
    app.chat.claim_session(id).await.unwrap();
    let uri = format!("/api/chat/sessions/{}/messages", id);

    for text in ["printer won't turn on", "  it was fine yesterday  "] {
        let (status, body) = app
            .request(Method::POST, &uri, Some(json!({ "content": text })), None)
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["sender"], "user");
    }

    let (status, body) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["printer won't turn on", "it was fine yesterday"]);
}

#[tokio::test]
async fn closed_session_refuses_messages() {
    let app = TestApp::new();
    let session = app.create_session().await;
    let id = session["id"].as_str().unwrap();

    let (status, body) = app
        .request(Method::POST, &format!("/api/chat/sessions/{}/close", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");

    // Closing twice is harmless.
    let (status, _) = app
        .request(Method::POST, &format!("/api/chat/sessions/{}/close", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/chat/sessions/{}/messages", id),
            Some(json!({"content": "anyone?"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_schema_is_reported_distinctly() {
    let app = TestApp::new();
    app.store.set_failure(Some(InjectedFailure::SchemaMissing));

    let (status, body) = app
        .request(Method::POST, "/api/chat/sessions", None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("chat_sessions"));
    assert!(message.contains("migrations"));
}

#[tokio::test]
async fn unreachable_store_is_a_generic_retry() {
    let app = TestApp::new();
    app.store.set_failure(Some(InjectedFailure::Unreachable));

    let (status, body) = app
        .request(Method::POST, "/api/chat/sessions", None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!body["error"].as_str().unwrap().contains("migrations"));

    app.store.set_failure(None);
    app.create_session().await;
}

#[tokio::test]
async fn session_creation_is_rate_limited_per_peer_address() {
    let app = TestApp::with_config(Config {
        session_create_limit: 2,
        ..test_config()
    });

    let create = |peer: [u8; 4], forwarded_for: &'static str| {
        let router = app.router.clone();
        async move {
            let mut request = json_request_from(
                SocketAddr::from((peer, 40_000)),
                Method::POST,
                "/api/chat/sessions",
                None,
                None,
            );
            request
                .headers_mut()
                .insert("x-forwarded-for", forwarded_for.parse().unwrap());
            router.oneshot(request).await.unwrap()
        }
    };

    // Rewriting the forwarded-for header does not open a new bucket.
    assert_eq!(create([198, 51, 100, 1], "203.0.113.1").await.status(), StatusCode::CREATED);
    assert_eq!(create([198, 51, 100, 1], "203.0.113.2").await.status(), StatusCode::CREATED);
    for forwarded_for in ["203.0.113.3", "203.0.113.4", "203.0.113.5"] {
        let limited = create([198, 51, 100, 1], forwarded_for).await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key("retry-after"));
    }

    assert_eq!(create([198, 51, 100, 2], "203.0.113.1").await.status(), StatusCode::CREATED);
    assert_eq!(app.store.session_count(), 3);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::new();
    let mut request = json_request(Method::POST, "/api/chat/sessions", None, None);
    request
        .headers_mut()
        .insert("x-request-id", "client-req-123".parse().unwrap());
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "client-req-123");

    let response = app
        .router
        .clone()
        .oneshot(json_request(Method::GET, "/api/chat/sessions/not-a-uuid", None, None))
        .await
        .unwrap();
    let minted = response.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());
}
