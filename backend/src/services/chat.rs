//! The shared chat handle: store writes plus change notifications.

use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatSession, NewMessage};
use crate::services::event_bus::{ChangeEvent, EventBus, EventFilter, Subscription};
use crate::services::store::{ChatStore, ClaimOutcome, CloseOutcome};
use crate::types::SessionId;

/// Explicitly constructed client handle shared by the visitor widget, the
/// admin console and the HTTP handlers.
///
/// Successful writes are published on the bus exactly once; failed and no-op
/// writes publish nothing.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    bus: EventBus,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, bus: EventBus) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub async fn create_session(&self, user_name: &str) -> Result<ChatSession, StoreError> {
        let session = self.store.create_session(user_name).await?;
        tracing::info!(session_id = %session.id, "Chat session created");
        self.bus.publish(ChangeEvent::SessionInserted(session.clone()));
        Ok(session)
    }

    pub async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>, StoreError> {
        self.store.find_session(id).await
    }

    pub async fn require_session(&self, id: SessionId) -> Result<ChatSession, StoreError> {
        self.store
            .find_session(id)
            .await?
            .ok_or(StoreError::NotFound("session"))
    }

    pub async fn list_active_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        self.store.list_active_sessions().await
    }

    pub async fn claim_session(&self, id: SessionId) -> Result<ClaimOutcome, StoreError> {
        let outcome = self.store.claim_session(id).await?;
        match &outcome {
            ClaimOutcome::Claimed(session) => {
                tracing::info!(session_id = %id, "Chat session claimed");
                self.bus.publish(ChangeEvent::SessionUpdated(session.clone()));
            }
            ClaimOutcome::AlreadyClaimed(_) => {
                tracing::info!(session_id = %id, "Chat session was already claimed");
            }
            ClaimOutcome::Closed(_) => {
                tracing::info!(session_id = %id, "Chat session closed before claim");
            }
        }
        Ok(outcome)
    }

    pub async fn close_session(&self, id: SessionId) -> Result<CloseOutcome, StoreError> {
        let outcome = self.store.close_session(id).await?;
        if let CloseOutcome::Closed(session) = &outcome {
            tracing::info!(session_id = %id, "Chat session closed");
            self.bus.publish(ChangeEvent::SessionUpdated(session.clone()));
        }
        Ok(outcome)
    }

    pub async fn send_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let stored = self.store.insert_message(message).await?;
        tracing::debug!(
            session_id = %stored.session_id,
            message_id = %stored.id,
            sender = stored.sender.as_str(),
            "Chat message stored"
        );
        self.bus.publish(ChangeEvent::MessageInserted(stored.clone()));
        Ok(stored)
    }

    pub async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.list_messages(session_id).await
    }
}
