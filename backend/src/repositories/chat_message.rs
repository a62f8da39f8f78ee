//! SQL for the `chat_messages` relation. Rows are insert-only.

use sqlx::PgPool;

use crate::models::chat_message::{ChatMessage, NewMessage};
use crate::types::{MessageId, SessionId};

const SELECT_COLUMNS: &str = "id, session_id, content, sender, created_at";

/// Inserts the message only while its session exists and is not closed.
///
/// Returns `None` when the guard rejected the insert.
pub async fn insert_message_into_open_session(
    pool: &PgPool,
    message_id: MessageId,
    message: &NewMessage,
) -> Result<Option<ChatMessage>, sqlx::Error> {
    let query = format!(
        r#"
        INSERT INTO chat_messages (id, session_id, content, sender)
        SELECT $1, s.id, $3, $4
        FROM chat_sessions s
        WHERE s.id = $2 AND s.status <> 'closed'
        RETURNING {}
        "#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatMessage>(&query)
        .bind(message_id)
        .bind(message.session_id())
        .bind(message.content())
        .bind(message.sender())
        .fetch_optional(pool)
        .await
}

pub async fn list_messages_for_session(
    pool: &PgPool,
    session_id: SessionId,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {}
        FROM chat_messages
        WHERE session_id = $1
        ORDER BY created_at ASC, id ASC
        "#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatMessage>(&query)
        .bind(session_id)
        .fetch_all(pool)
        .await
}
