//! Data models shared across database access, clients and API handlers.

pub mod admin;
pub mod chat_message;
pub mod chat_session;

pub use chat_message::{ChatMessage, NewMessage, SendMessageRequest, Sender};
pub use chat_session::{ChatSession, SessionStatus};
