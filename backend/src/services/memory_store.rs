//! In-process `ChatStore` for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::models::{ChatMessage, ChatSession, NewMessage, SessionStatus};
use crate::services::store::{ChatStore, ClaimOutcome, CloseOutcome};
use crate::types::SessionId;

/// Fault a `MemoryChatStore` can be told to report on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    Unreachable,
    SchemaMissing,
}

impl InjectedFailure {
    fn to_error(self) -> StoreError {
        match self {
            InjectedFailure::Unreachable => {
                StoreError::Unreachable("connection refused (injected)".to_string())
            }
            InjectedFailure::SchemaMissing => StoreError::SchemaMissing {
                relation: "chat_sessions".to_string(),
            },
        }
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, ChatSession>,
    messages: Vec<ChatMessage>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing so two rows never share a `created_at`.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

#[derive(Default)]
pub struct MemoryChatStore {
    inner: Mutex<Inner>,
    failure: Mutex<Option<InjectedFailure>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `failure`, or heals the store with `None`.
    pub fn set_failure(&self, failure: Option<InjectedFailure>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = failure;
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        match *self.failure.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn create_session(&self, user_name: &str) -> Result<ChatSession, StoreError> {
        self.check()?;
        let mut inner = self.lock();
        let session = ChatSession {
            id: SessionId::new(),
            user_name: user_name.to_string(),
            status: SessionStatus::Waiting,
            created_at: inner.next_timestamp(),
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: SessionId) -> Result<Option<ChatSession>, StoreError> {
        self.check()?;
        Ok(self.lock().sessions.get(&id).cloned())
    }

    async fn list_active_sessions(&self) -> Result<Vec<ChatSession>, StoreError> {
        self.check()?;
        let mut sessions: Vec<ChatSession> = self
            .lock()
            .sessions
            .values()
            .filter(|s| s.status.is_active())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(sessions)
    }

    async fn claim_session(&self, id: SessionId) -> Result<ClaimOutcome, StoreError> {
        self.check()?;
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("session"))?;
        Ok(match session.status {
            SessionStatus::Waiting => {
                session.status = SessionStatus::Connected;
                ClaimOutcome::Claimed(session.clone())
            }
            SessionStatus::Connected => ClaimOutcome::AlreadyClaimed(session.clone()),
            SessionStatus::Closed => ClaimOutcome::Closed(session.clone()),
        })
    }

    async fn close_session(&self, id: SessionId) -> Result<CloseOutcome, StoreError> {
        self.check()?;
        let mut inner = self.lock();
        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or(StoreError::NotFound("session"))?;
        if session.status == SessionStatus::Closed {
            return Ok(CloseOutcome::AlreadyClosed(session.clone()));
        }
        session.status = SessionStatus::Closed;
        Ok(CloseOutcome::Closed(session.clone()))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        self.check()?;
        let mut inner = self.lock();
        let status = inner
            .sessions
            .get(&message.session_id())
            .map(|s| s.status)
            .ok_or(StoreError::NotFound("session"))?;
        if status == SessionStatus::Closed {
            return Err(StoreError::Invalid("Chat session is closed".to_string()));
        }
        let created_at = inner.next_timestamp();
        let mut stored = message.into_message();
        stored.created_at = created_at;
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, session_id: SessionId) -> Result<Vec<ChatMessage>, StoreError> {
        self.check()?;
        let mut messages: Vec<ChatMessage> = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(ChatMessage::ordering_key);
        Ok(messages)
    }
}
