//! Concurrent claims on one waiting session: exactly one admin wins.

use axum::http::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use printdesk_backend::{
    clients::{AdminConsole, ClientError, ConsoleState},
    models::SessionStatus,
    services::{ChatService, EventBus, MemoryChatStore},
};

mod support;

use support::{authenticator, test_config, TestApp, ADMIN_PASSWORD, ADMIN_USERNAME};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_service_claims_have_one_winner() {
    let service = ChatService::new(Arc::new(MemoryChatStore::new()), EventBus::new(64));
    let session = service.create_session("Guest User").await.unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.claim_session(session.id).await })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        let outcome = attempt.await.unwrap().unwrap();
        assert_eq!(outcome.session().status, SessionStatus::Connected);
        if outcome.is_claimed() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_http_claims_return_one_ok_and_one_conflict() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let session = app.create_session().await;
    let uri = format!(
        "/api/admin/chat/sessions/{}/claim",
        session["id"].as_str().unwrap()
    );

    let (first, second) = tokio::join!(
        app.request(Method::POST, &uri, None, Some(&token)),
        app.request(Method::POST, &uri, None, Some(&token)),
    );
    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn losing_console_is_told_and_not_connected() {
    let service = ChatService::new(Arc::new(MemoryChatStore::new()), EventBus::new(64));
    let config = test_config();
    let mut alice = AdminConsole::new(
        service.clone(),
        authenticator(&config),
        Duration::from_secs(60),
    );
    let mut bob = AdminConsole::new(
        service.clone(),
        authenticator(&config),
        Duration::from_secs(60),
    );
    alice.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
    bob.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();

    let session = service.create_session("Guest User").await.unwrap();
    alice.refresh().await.unwrap();
    bob.refresh().await.unwrap();

    let (a, b) = tokio::join!(alice.select(session.id), bob.select(session.id));
    let results = [a.is_ok(), b.is_ok()];
    assert_eq!(results.iter().filter(|ok| **ok).count(), 1);

    let (winner, loser, loser_err) = match (a, b) {
        (Ok(()), Err(err)) => (&alice, &bob, err),
        (Err(err), Ok(())) => (&bob, &alice, err),
        other => panic!("expected exactly one winner, got {:?}", other),
    };
    assert!(matches!(loser_err, ClientError::AlreadyClaimed));
    assert_eq!(winner.state(), ConsoleState::SessionSelected(session.id));
    assert_eq!(loser.state(), ConsoleState::Authenticated);
    assert!(loser.notice().is_some());

    alice.logout().await;
    bob.logout().await;
}
