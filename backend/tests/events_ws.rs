use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

use printdesk_backend::{
    models::{NewMessage, Sender},
    types::SessionId,
};

mod support;

use support::TestApp;

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Next JSON frame that is not a keepalive.
async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let tungstenite::Message::Text(text) = message {
            let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
            if value["type"] != "ping" {
                return value;
            }
        }
    }
}

#[tokio::test]
async fn visitor_stream_delivers_claim_and_messages() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    let session = app.chat.create_session("Guest User").await.unwrap();

    let url = format!("ws://{}/api/chat/sessions/{}/events", addr, session.id);
    let (mut socket, _) = connect_async(url).await.expect("connect");
    assert_eq!(next_frame(&mut socket).await["type"], "ready");

    app.chat.claim_session(session.id).await.unwrap();
    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["type"], "session_updated");
    assert_eq!(frame["record"]["status"], "connected");

    app.chat
        .send_message(NewMessage::new(session.id, Sender::Expert, "hello from support").unwrap())
        .await
        .unwrap();
    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["type"], "message_inserted");
    assert_eq!(frame["record"]["content"], "hello from support");
    assert_eq!(frame["record"]["sender"], "expert");
}

#[tokio::test]
async fn visitor_stream_for_unknown_session_is_refused() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    let url = format!("ws://{}/api/chat/sessions/{}/events", addr, SessionId::new());

    match connect_async(url).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 404),
        other => panic!("expected HTTP 404, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn admin_stream_requires_token_and_sees_new_sessions() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;

    let anonymous = format!("ws://{}/api/admin/chat/events", addr);
    match connect_async(anonymous).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP 401, got {:?}", other.map(|_| ())),
    }

    let token = app.admin_token().await;
    let url = format!("ws://{}/api/admin/chat/events?access_token={}", addr, token);
    let (mut socket, _) = connect_async(url).await.expect("connect");
    assert_eq!(next_frame(&mut socket).await["type"], "ready");

    let session = app.chat.create_session("Guest User").await.unwrap();
    let frame = next_frame(&mut socket).await;
    assert_eq!(frame["type"], "session_inserted");
    assert_eq!(frame["record"]["id"], session.id.to_string());
}

#[tokio::test]
async fn closing_the_socket_releases_subscriptions() {
    let app = TestApp::new();
    let addr = app.spawn_server().await;
    let session = app.chat.create_session("Guest User").await.unwrap();

    let url = format!("ws://{}/api/chat/sessions/{}/events", addr, session.id);
    let (mut socket, _) = connect_async(url).await.expect("connect");
    assert_eq!(next_frame(&mut socket).await["type"], "ready");
    assert_eq!(app.chat.bus().live_subscriptions(), 2);

    socket.close(None).await.expect("close");
    let released = support::eventually(Duration::from_secs(2), || {
        let live = app.chat.bus().live_subscriptions();
        async move { live == 0 }
    })
    .await;
    assert!(released, "subscriptions still live after close");
}
