//! Chat messages exchanged inside a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::{MessageId, SessionId};
use crate::validation::rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
/// Which side of the conversation authored a message.
pub enum Sender {
    /// The anonymous visitor.
    User,
    /// The admin handling the session.
    Expert,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a single chat utterance. Immutable once stored.
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub content: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Messages render in `created_at` order; the id breaks ties so the order is total.
    pub fn ordering_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.created_at, self.id)
    }
}

/// A message that passed content checks and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    session_id: SessionId,
    sender: Sender,
    content: String,
}

impl NewMessage {
    /// Trims `content`; fails when nothing is left.
    pub fn new(
        session_id: SessionId,
        sender: Sender,
        content: &str,
    ) -> Result<Self, validator::ValidationError> {
        let content = rules::normalize_message_content(content)?;
        Ok(Self {
            session_id,
            sender,
            content,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: MessageId::new(),
            session_id: self.session_id,
            content: self.content,
            sender: self.sender,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for posting a message from either side.
pub struct SendMessageRequest {
    #[validate(custom(function = "rules::validate_message_content"))]
    pub content: String,
}
