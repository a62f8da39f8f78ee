#![allow(dead_code)]
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};
use tower::ServiceExt;

use printdesk_backend::{
    config::{Config, StoreBackend},
    routes::build_router,
    services::{Authenticator, ChatService, EventBus, MemoryChatStore, PasswordAuthenticator},
    state::AppState,
    utils::password::hash_password,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery-staple";

static ADMIN_PASSWORD_HASH: OnceLock<String> = OnceLock::new();

fn admin_password_hash() -> String {
    ADMIN_PASSWORD_HASH
        .get_or_init(|| hash_password(ADMIN_PASSWORD).expect("hash admin password"))
        .clone()
}

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        jwt_secret: "test-jwt-secret".to_string(),
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password_hash: Some(admin_password_hash()),
        poll_interval_secs: 1,
        session_create_limit: 1000,
        login_limit: 1000,
        ..Config::default()
    }
}

pub fn authenticator(config: &Config) -> Arc<dyn Authenticator> {
    Arc::new(PasswordAuthenticator::from_config(config))
}

/// A router over an in-memory store, plus handles to inspect that store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryChatStore>,
    pub chat: ChatService,
    pub config: Config,
    pub authenticator: Arc<dyn Authenticator>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryChatStore::new());
        let chat = ChatService::new(store.clone(), EventBus::new(config.event_buffer));
        let authenticator = authenticator(&config);
        let state = AppState::new(chat.clone(), authenticator.clone(), config.clone());
        Self {
            router: build_router(state),
            store,
            chat,
            config,
            authenticator,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(json_request(method, uri, body, token))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/admin/login",
                Some(serde_json::json!({
                    "username": ADMIN_USERNAME,
                    "password": ADMIN_PASSWORD,
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    pub async fn create_session(&self) -> Value {
        let (status, body) = self
            .request(Method::POST, "/api/chat/sessions", None, None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }

    /// Serves the router on an ephemeral local port.
    pub async fn spawn_server(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let app = self
            .router
            .clone()
            .into_make_service_with_connect_info::<SocketAddr>();
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        addr
    }
}

/// Peer address attached to router requests that do not name one.
pub const DEFAULT_PEER: ([u8; 4], u16) = ([127, 0, 0, 1], 40_000);

pub fn json_request(
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Request<Body> {
    json_request_from(SocketAddr::from(DEFAULT_PEER), method, uri, body, token)
}

/// Like [`json_request`], as if it arrived on a connection from `peer`.
pub fn json_request_from(
    peer: SocketAddr,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(peer));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Polls `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
