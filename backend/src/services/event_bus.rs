//! Row-change notifications for chat sessions and messages.
//!
//! Every write that lands in the store is published once on a broadcast
//! channel. Subscribers pick what they care about with an [`EventFilter`] and
//! hold a [`Subscription`] handle; dropping the handle releases it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use utoipa::ToSchema;

use crate::models::{ChatMessage, ChatSession};
use crate::types::SessionId;

/// Default size of the broadcast channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// A row-level change in the chat store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum ChangeEvent {
    SessionInserted(ChatSession),
    SessionUpdated(ChatSession),
    MessageInserted(ChatMessage),
}

impl ChangeEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            ChangeEvent::SessionInserted(s) | ChangeEvent::SessionUpdated(s) => s.id,
            ChangeEvent::MessageInserted(m) => m.session_id,
        }
    }
}

/// What a subscription wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Updates to one session row (the visitor watching its own status).
    SessionRow(SessionId),
    /// Inserts and updates of any session (the admin's list).
    AllSessions,
    /// Message inserts for one session.
    MessagesFor(SessionId),
}

impl EventFilter {
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match (self, event) {
            (EventFilter::SessionRow(id), ChangeEvent::SessionUpdated(s)) => s.id == *id,
            (EventFilter::AllSessions, ChangeEvent::SessionInserted(_))
            | (EventFilter::AllSessions, ChangeEvent::SessionUpdated(_)) => true,
            (EventFilter::MessagesFor(id), ChangeEvent::MessageInserted(m)) => m.session_id == *id,
            _ => false,
        }
    }
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Change(ChangeEvent),
    /// The receiver fell behind and events were dropped; reload from the store.
    Resync,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
    live: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fans `event` out to current subscribers. Returns how many receivers saw it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::trace!(session_id = %event.session_id(), ?event, "Publishing chat change");
        // No receivers is not an error: nobody is watching yet.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.live.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(?filter, "Chat subscription established");
        Subscription {
            rx: self.tx.subscribe(),
            filter,
            live: Arc::clone(&self.live),
        }
    }

    /// Number of subscription handles that have not been released.
    pub fn live_subscriptions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

/// A filtered view of the bus. Released on drop.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: EventFilter,
    live: Arc<AtomicUsize>,
}

impl Subscription {
    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    /// Waits for the next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Change(event))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, filter = ?self.filter, "Chat subscription lagged");
                    return Some(Notification::Resync);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns a matching event that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Change(event))
                }
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, filter = ?self.filter, "Chat subscription lagged");
                    return Some(Notification::Resync);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Explicit form of dropping the handle.
    pub fn release(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(filter = ?self.filter, "Chat subscription released");
    }
}
