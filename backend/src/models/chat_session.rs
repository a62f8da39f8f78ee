//! Chat session records and their status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Lifecycle state of a chat session.
pub enum SessionStatus {
    /// Created by a visitor, not yet claimed by an admin.
    Waiting,
    /// Claimed by an admin; messages flow both ways.
    Connected,
    /// Ended by either side. Terminal.
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Connected => "connected",
            SessionStatus::Closed => "closed",
        }
    }

    /// Sessions that still show up in the admin's list.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Waiting | SessionStatus::Connected)
    }

    /// Status only moves forward: waiting -> connected -> closed, or waiting -> closed.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Waiting, SessionStatus::Connected)
                | (SessionStatus::Waiting, SessionStatus::Closed)
                | (SessionStatus::Connected, SessionStatus::Closed)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a visitor's support conversation.
pub struct ChatSession {
    /// Unique identifier generated at creation.
    pub id: SessionId,
    /// Display label for the visitor.
    pub user_name: String,
    /// Current lifecycle state.
    pub status: SessionStatus,
    /// Creation timestamp; never changes.
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            user_name: user_name.into(),
            status: SessionStatus::Waiting,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_moves_backwards() {
        assert!(SessionStatus::Waiting.can_transition_to(SessionStatus::Connected));
        assert!(SessionStatus::Connected.can_transition_to(SessionStatus::Closed));
        assert!(!SessionStatus::Connected.can_transition_to(SessionStatus::Waiting));
        assert!(!SessionStatus::Closed.can_transition_to(SessionStatus::Connected));
        assert!(!SessionStatus::Closed.can_transition_to(SessionStatus::Waiting));
        assert!(!SessionStatus::Waiting.can_transition_to(SessionStatus::Waiting));
    }

    #[test]
    fn closed_sessions_are_not_active() {
        assert!(SessionStatus::Waiting.is_active());
        assert!(SessionStatus::Connected.is_active());
        assert!(!SessionStatus::Closed.is_active());
    }

    #[test]
    fn new_session_starts_waiting() {
        let session = ChatSession::new("Guest User");
        assert_eq!(session.status, SessionStatus::Waiting);
        assert_eq!(session.user_name, "Guest User");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_value(SessionStatus::Connected).unwrap();
        assert_eq!(json, "connected");
    }
}
