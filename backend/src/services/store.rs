//! The chat store: the single source of truth for sessions and messages.
//!
//! Clients only ever hold read projections of what lives here. The trait is
//! object safe so the visitor widget, admin console and HTTP handlers can share
//! one injected `Arc<dyn ChatStore>`, and mockable so failure paths can be
//! exercised without a database.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatSession, NewMessage};
use crate::types::SessionId;

/// Result of trying to move a session from `waiting` to `connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller performed the transition.
    Claimed(ChatSession),
    /// Someone else already claimed it.
    AlreadyClaimed(ChatSession),
    /// The session ended before anyone claimed it.
    Closed(ChatSession),
}

impl ClaimOutcome {
    pub fn session(&self) -> &ChatSession {
        match self {
            ClaimOutcome::Claimed(s) | ClaimOutcome::AlreadyClaimed(s) | ClaimOutcome::Closed(s) => s,
        }
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed(_))
    }
}

/// Result of ending a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed(ChatSession),
    AlreadyClosed(ChatSession),
}

impl CloseOutcome {
    pub fn session(&self) -> &ChatSession {
        match self {
            CloseOutcome::Closed(s) | CloseOutcome::AlreadyClosed(s) => s,
        }
    }
}

/// Persistence contract for chat sessions and messages.
///
/// Use `MockChatStore` in tests to script failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a session in the `waiting` state.
    async fn create_session(&self, user_name: &str) -> Result<ChatSession, StoreError>;

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>, StoreError>;

    /// Waiting and connected sessions, newest first.
    async fn list_active_sessions(&self) -> Result<Vec<ChatSession>, StoreError>;

    /// Conditional `waiting -> connected`; exactly one concurrent caller wins.
    async fn claim_session(&self, id: SessionId) -> Result<ClaimOutcome, StoreError>;

    async fn close_session(&self, id: SessionId) -> Result<CloseOutcome, StoreError>;

    /// Store a message. Fails for unknown or closed sessions.
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    /// All messages of a session in ascending `created_at` order.
    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>, StoreError>;
}
