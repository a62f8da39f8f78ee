//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Longest message body accepted from either side of a chat.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Validates username format.
///
/// Requirements:
/// - Only alphanumeric characters and underscores
/// - 1-50 characters in length
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.len() > 50 {
        return Err(ValidationError::new("username_invalid_length"));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::new("username_invalid_characters"));
    }

    Ok(())
}

/// Validates a chat message body.
pub fn validate_message_content(content: &str) -> Result<(), ValidationError> {
    normalize_message_content(content).map(|_| ())
}

/// Trims surrounding whitespace and returns the body that gets stored.
pub fn normalize_message_content(content: &str) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("message_empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::new("message_too_long"));
    }
    Ok(trimmed.to_string())
}
