//! Input validation for chat payloads and admin credentials.
//!
//! Message bodies are checked here before any store call is attempted, so an
//! empty or whitespace-only message never leaves the client.

pub mod rules;

pub use rules::{normalize_message_content, validate_message_content};
pub use validator::Validate;
