use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatSession, NewMessage, SessionStatus};
use crate::repositories::{chat_message, chat_session};
use crate::services::store::{ChatStore, ClaimOutcome, CloseOutcome};
use crate::types::{MessageId, SessionId};

/// `ChatStore` backed by the Postgres `chat_sessions` / `chat_messages` tables.
#[derive(Debug, Clone)]
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn require_session(&self, id: SessionId) -> Result<ChatSession, StoreError> {
        chat_session::find_session_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound("session"))
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn create_session(&self, user_name: &str) -> Result<ChatSession, StoreError> {
        let session = chat_session::insert_session(&self.pool, SessionId::new(), user_name).await?;
        Ok(session)
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>, StoreError> {
        Ok(chat_session::find_session_by_id(&self.pool, id).await?)
    }

    async fn list_active_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        Ok(chat_session::list_active_sessions(&self.pool).await?)
    }

    async fn claim_session(&self, id: SessionId) -> Result<ClaimOutcome, StoreError> {
        if let Some(session) = chat_session::claim_waiting_session(&self.pool, id).await? {
            return Ok(ClaimOutcome::Claimed(session));
        }
        // Zero rows updated: the row is missing or no longer waiting.
        let current = self.require_session(id).await?;
        Ok(match current.status {
            SessionStatus::Closed => ClaimOutcome::Closed(current),
            _ => ClaimOutcome::AlreadyClaimed(current),
        })
    }

    async fn close_session(&self, id: SessionId) -> Result<CloseOutcome, StoreError> {
        if let Some(session) = chat_session::close_open_session(&self.pool, id).await? {
            return Ok(CloseOutcome::Closed(session));
        }
        let current = self.require_session(id).await?;
        Ok(CloseOutcome::AlreadyClosed(current))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let inserted =
            chat_message::insert_message_into_open_session(&self.pool, MessageId::new(), &message)
                .await?;
        match inserted {
            Some(stored) => Ok(stored),
            None => {
                self.require_session(message.session_id()).await?;
                Err(StoreError::Invalid("Chat session is closed".to_string()))
            }
        }
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(chat_message::list_messages_for_session(&self.pool, session_id).await?)
    }
}
