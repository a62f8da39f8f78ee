//! Client-side state machines for the two chat participants.
//!
//! Both clients hold an injected [`ChatService`](crate::services::ChatService)
//! and keep local, ephemeral projections of the store. Store failures are
//! caught at the operation that caused them, logged, and turned into a
//! [`Notice`] for the user; nothing propagates into rendering.

pub mod admin;
pub mod transcript;
pub mod visitor;

use validator::ValidationError;

use crate::error::StoreError;
use crate::services::AuthError;
use crate::validation::rules::MAX_MESSAGE_CHARS;

pub use admin::{AdminConsole, ConsoleState, ReconcileTrigger, SessionList};
pub use transcript::Transcript;
pub use visitor::{VisitorWidget, WidgetState};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Message is longer than {max} characters")]
    MessageTooLong { max: usize },
    #[error("Not allowed while {0}")]
    InvalidState(&'static str),
    #[error("Session was already claimed by another admin")]
    AlreadyClaimed,
    #[error("Session is no longer available")]
    SessionUnavailable,
    #[error("Not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    AccessDenied(#[from] AuthError),
}

impl ClientError {
    /// Maps a rejected draft onto the reason the user can act on.
    pub(crate) fn from_draft_rejection(err: &ValidationError) -> Self {
        match err.code.as_ref() {
            "message_too_long" => ClientError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
            },
            _ => ClientError::EmptyMessage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A user-visible message (the alert/banner of the UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// `None` for an empty draft: the send control is simply disabled.
    pub fn from_draft_error(err: &ClientError) -> Option<Self> {
        match err {
            ClientError::MessageTooLong { max } => Some(Self::error(format!(
                "Message is too long. Please shorten it to {} characters or fewer.",
                max
            ))),
            _ => None,
        }
    }

    /// Schema problems get a setup hint; connectivity problems ask for a manual retry.
    pub fn from_store_error(action: &str, err: &StoreError) -> Self {
        match err {
            StoreError::SchemaMissing { relation } => Self::error(format!(
                "Chat storage is not set up: table `{}` is missing. Run the database migrations, then try again.",
                relation
            )),
            StoreError::Unreachable(_) => Self::error(format!(
                "{} failed: the support service could not be reached. Please try again.",
                action
            )),
            other => Self::error(format!("{} failed: {}", action, other)),
        }
    }
}
