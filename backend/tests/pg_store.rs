//! `PgChatStore` against a real database. Skipped unless `TEST_DATABASE_URL` is set.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;

use printdesk_backend::{
    db::run_migrations,
    error::StoreError,
    models::{NewMessage, Sender, SessionStatus},
    services::{ChatStore, ClaimOutcome, PgChatStore},
};

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping Postgres store test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("connect test database");
    run_migrations(&pool).await.expect("migrate");
    Some(pool)
}

#[tokio::test]
async fn session_lifecycle_round_trip() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgChatStore::new(pool);

    let session = store.create_session("Guest User").await.unwrap();
    assert_eq!(session.status, SessionStatus::Waiting);

    let listed = store.list_active_sessions().await.unwrap();
    assert!(listed.iter().any(|s| s.id == session.id));

    assert!(store.claim_session(session.id).await.unwrap().is_claimed());
    assert!(matches!(
        store.claim_session(session.id).await.unwrap(),
        ClaimOutcome::AlreadyClaimed(_)
    ));

    for (sender, text) in [
        (Sender::User, "printer won't turn on"),
        (Sender::Expert, "try holding the power button for 10 seconds"),
    ] {
        store
            .insert_message(NewMessage::new(session.id, sender, text).unwrap())
            .await
            .unwrap();
    }
    let messages = store.list_messages(session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert!(messages[0].ordering_key() < messages[1].ordering_key());

    store.close_session(session.id).await.unwrap();
    assert!(matches!(
        store
            .insert_message(NewMessage::new(session.id, Sender::User, "still there?").unwrap())
            .await,
        Err(StoreError::Invalid(_))
    ));
    let listed = store.list_active_sessions().await.unwrap();
    assert!(!listed.iter().any(|s| s.id == session.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn conditional_claim_is_exclusive_under_concurrency() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = std::sync::Arc::new(PgChatStore::new(pool));
    let session = store.create_session("Guest User").await.unwrap();

    let attempts: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_session(session.id).await })
        })
        .collect();
    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap().unwrap().is_claimed() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn missing_tables_are_reported_as_schema_missing() {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        return;
    };
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect test database");
    sqlx::query("CREATE SCHEMA IF NOT EXISTS printdesk_unmigrated")
        .execute(&admin)
        .await
        .unwrap();

    let options = PgConnectOptions::from_str(&url)
        .unwrap()
        .options([("search_path", "printdesk_unmigrated")]);
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    let store = PgChatStore::new(pool);

    match store.create_session("Guest User").await {
        Err(StoreError::SchemaMissing { relation }) => assert_eq!(relation, "chat_sessions"),
        other => panic!("expected schema-missing error, got {:?}", other),
    }
}
