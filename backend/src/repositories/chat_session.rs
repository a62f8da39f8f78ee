//! SQL for the `chat_sessions` relation.

use sqlx::PgPool;

use crate::models::chat_session::ChatSession;
use crate::types::SessionId;

const SELECT_COLUMNS: &str = "id, user_name, status, created_at";

pub async fn insert_session(
    pool: &PgPool,
    session_id: SessionId,
    user_name: &str,
) -> Result<ChatSession, sqlx::Error> {
    let query = format!(
        "INSERT INTO chat_sessions (id, user_name, status) VALUES ($1, $2, 'waiting') RETURNING {}",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatSession>(&query)
        .bind(session_id)
        .bind(user_name)
        .fetch_one(pool)
        .await
}

pub async fn find_session_by_id(
    pool: &PgPool,
    session_id: SessionId,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let query = format!("SELECT {} FROM chat_sessions WHERE id = $1", SELECT_COLUMNS);
    sqlx::query_as::<_, ChatSession>(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_active_sessions(pool: &PgPool) -> Result<Vec<ChatSession>, sqlx::Error> {
    let query = format!(
        r#"
        SELECT {}
        FROM chat_sessions
        WHERE status IN ('waiting', 'connected')
        ORDER BY created_at DESC, id DESC
        "#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatSession>(&query).fetch_all(pool).await
}

/// Moves a session to `connected` only if it is still `waiting`.
///
/// Returns `None` when another writer got there first (or the row is gone);
/// callers re-read the row to find out which.
pub async fn claim_waiting_session(
    pool: &PgPool,
    session_id: SessionId,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE chat_sessions
        SET status = 'connected'
        WHERE id = $1 AND status = 'waiting'
        RETURNING {}
        "#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatSession>(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

/// Moves a session to `closed` unless it already is.
pub async fn close_open_session(
    pool: &PgPool,
    session_id: SessionId,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let query = format!(
        r#"
        UPDATE chat_sessions
        SET status = 'closed'
        WHERE id = $1 AND status <> 'closed'
        RETURNING {}
        "#,
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, ChatSession>(&query)
        .bind(session_id)
        .fetch_optional(pool)
        .await
}
