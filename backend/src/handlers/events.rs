//! WebSocket feeds of chat changes.
//!
//! Each connection owns its subscriptions; they are released when the socket
//! closes. Frames are JSON: a [`ChangeEvent`] per change, plus control frames
//! (`ready` once subscribed, `resync` when the feed dropped events and the
//! client should reload, `ping` as keepalive).

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;

use crate::{
    error::AppError,
    services::{AdminIdentity, ChangeEvent, EventFilter, Notification, Subscription},
    state::AppState,
    types::SessionId,
};

const PING_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlFrame {
    Ready,
    Resync,
    Ping,
}

/// GET /api/chat/sessions/{id}/events
pub async fn session_events(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    state.chat.require_session(session_id).await?;
    let subscriptions = vec![
        state.chat.subscribe(EventFilter::SessionRow(session_id)),
        state.chat.subscribe(EventFilter::MessagesFor(session_id)),
    ];
    tracing::debug!(session_id = %session_id, "Visitor event stream requested");
    Ok(ws.on_upgrade(move |socket| stream_events(socket, subscriptions)))
}

/// GET /api/admin/chat/events
pub async fn admin_events(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    ws: WebSocketUpgrade,
) -> Response {
    let subscriptions = vec![state.chat.subscribe(EventFilter::AllSessions)];
    tracing::debug!(admin = %admin.username, "Admin event stream requested");
    ws.on_upgrade(move |socket| stream_events(socket, subscriptions))
}

async fn stream_events(socket: WebSocket, mut subscriptions: Vec<Subscription>) {
    let (mut sender, mut receiver) = socket.split();

    if send_json(&mut sender, &ControlFrame::Ready).await.is_err() {
        return;
    }

    let mut ping_interval = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping_interval.tick().await;

    loop {
        tokio::select! {
            notification = next_notification(&mut subscriptions) => {
                let sent = match notification {
                    Some(Notification::Change(event)) => send_json::<_, ChangeEvent>(&mut sender, &event).await,
                    Some(Notification::Resync) => send_json(&mut sender, &ControlFrame::Resync).await,
                    None => break,
                };
                if sent.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // The feed is one-way; anything else from the client is ignored.
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                if send_json(&mut sender, &ControlFrame::Ping).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Chat event stream closed");
}

/// Next notification from whichever subscription has one first.
async fn next_notification(subscriptions: &mut [Subscription]) -> Option<Notification> {
    match subscriptions {
        [] => std::future::pending().await,
        [only] => only.recv().await,
        [first, second, ..] => tokio::select! {
            n = first.recv() => n,
            n = second.recv() => n,
        },
    }
}

async fn send_json<S, T>(sender: &mut S, value: &T) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
    T: Serialize,
{
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to serialize chat event");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_frames_are_tagged() {
        assert_eq!(
            serde_json::to_string(&ControlFrame::Ready).unwrap(),
            r#"{"type":"ready"}"#
        );
        assert_eq!(
            serde_json::to_string(&ControlFrame::Resync).unwrap(),
            r#"{"type":"resync"}"#
        );
    }
}
