//! The admin's support console.
//!
//! States: unauthenticated -> authenticated (no selection) -> session selected.
//!
//! While authenticated the active-session list is kept fresh three ways:
//! manual [`AdminConsole::refresh`], a fixed-interval poll task and a push
//! task fed by the `AllSessions` subscription. All three go through
//! [`SessionList::reconcile`], which only applies a result when no newer
//! reconcile has been applied already. Polling keeps the list within one
//! interval of the store even when the push feed delivers nothing.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clients::{ClientError, Notice, Transcript};
use crate::config::Config;
use crate::error::StoreError;
use crate::models::{ChatMessage, ChatSession, NewMessage, Sender, SessionStatus};
use crate::services::{
    AdminIdentity, AuthError, Authenticator, ChangeEvent, ChatService, ClaimOutcome, EventFilter,
    Notification, Subscription,
};
use crate::types::SessionId;
use crate::validation::normalize_message_content;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Unauthenticated,
    Authenticated,
    SessionSelected(SessionId),
}

/// What asked for a list reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileTrigger {
    Manual,
    Poll,
    Push,
}

impl ReconcileTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            ReconcileTrigger::Manual => "manual",
            ReconcileTrigger::Poll => "poll",
            ReconcileTrigger::Push => "push",
        }
    }
}

#[derive(Default)]
struct SessionListState {
    sessions: Vec<ChatSession>,
    applied_ticket: u64,
    notice: Option<Notice>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// The admin's projection of active sessions, shared with the background tasks.
#[derive(Clone)]
pub struct SessionList {
    service: ChatService,
    inner: Arc<RwLock<SessionListState>>,
    tickets: Arc<AtomicU64>,
}

impl SessionList {
    pub fn new(service: ChatService) -> Self {
        Self {
            service,
            inner: Arc::new(RwLock::new(SessionListState::default())),
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reloads the active sessions from the store.
    ///
    /// Returns whether the result was applied; a reload that finishes after
    /// a newer one has landed is discarded, success or failure. A failure
    /// keeps the previous list and records a notice; a success clears it.
    pub async fn reconcile(&self, trigger: ReconcileTrigger) -> Result<bool, StoreError> {
        let ticket = self.next_ticket();
        let result = self.service.list_active_sessions().await;
        self.apply(ticket, trigger, result)
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(
        &self,
        ticket: u64,
        trigger: ReconcileTrigger,
        result: Result<Vec<ChatSession>, StoreError>,
    ) -> Result<bool, StoreError> {
        let mut state = self.write();
        if ticket <= state.applied_ticket {
            tracing::debug!(ticket, trigger = trigger.as_str(), "Discarding stale session list");
            return result.map(|_| false);
        }
        state.applied_ticket = ticket;
        match result {
            Ok(sessions) => {
                tracing::debug!(
                    ticket,
                    trigger = trigger.as_str(),
                    count = sessions.len(),
                    "Session list reconciled"
                );
                state.sessions = sessions;
                state.notice = None;
                state.refreshed_at = Some(Utc::now());
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(ticket, trigger = trigger.as_str(), error = %err, "Failed to load chat sessions");
                state.notice = Some(Notice::from_store_error("Loading chat sessions", &err));
                Err(err)
            }
        }
    }

    pub fn snapshot(&self) -> Vec<ChatSession> {
        self.read().sessions.clone()
    }

    pub fn find(&self, id: SessionId) -> Option<ChatSession> {
        self.read().sessions.iter().find(|s| s.id == id).cloned()
    }

    /// The blocking alert from the last applied reconcile, if it failed.
    pub fn notice(&self) -> Option<Notice> {
        self.read().notice.clone()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read().refreshed_at
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionListState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionListState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Poll and push tasks for one authenticated console. Aborted on drop.
struct Reconciler {
    poll: JoinHandle<()>,
    push: JoinHandle<()>,
}

impl Reconciler {
    fn spawn(list: SessionList, poll_interval: Duration) -> Self {
        let poll_list = list.clone();
        let poll = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the initial load already happened.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let _ = poll_list.reconcile(ReconcileTrigger::Poll).await;
            }
        });

        // Subscribe before spawning so the subscription is live on return.
        let mut changes = list.service.subscribe(EventFilter::AllSessions);
        let push = tokio::spawn(async move {
            while changes.recv().await.is_some() {
                let _ = list.reconcile(ReconcileTrigger::Push).await;
            }
            tracing::warn!("Session change feed ended; falling back to polling");
        });

        Self { poll, push }
    }

    /// Aborts both tasks and waits until their resources are released.
    async fn shutdown(&mut self) {
        self.poll.abort();
        self.push.abort();
        let _ = (&mut self.poll).await;
        let _ = (&mut self.push).await;
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.poll.abort();
        self.push.abort();
    }
}

struct AuthSession {
    identity: AdminIdentity,
    access_token: String,
    list: SessionList,
    reconciler: Reconciler,
}

struct Selection {
    session_id: SessionId,
    messages: Subscription,
}

pub struct AdminConsole {
    service: ChatService,
    authenticator: Arc<dyn Authenticator>,
    poll_interval: Duration,
    auth: Option<AuthSession>,
    selection: Option<Selection>,
    transcript: Transcript,
    draft: String,
    notice: Option<Notice>,
}

impl AdminConsole {
    pub fn new(
        service: ChatService,
        authenticator: Arc<dyn Authenticator>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            authenticator,
            poll_interval,
            auth: None,
            selection: None,
            transcript: Transcript::new(),
            draft: String::new(),
            notice: None,
        }
    }

    /// Console polling at `CHAT_POLL_INTERVAL_SECS`.
    pub fn from_config(
        service: ChatService,
        authenticator: Arc<dyn Authenticator>,
        config: &Config,
    ) -> Self {
        Self::new(service, authenticator, config.poll_interval())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn state(&self) -> ConsoleState {
        match (&self.auth, &self.selection) {
            (None, _) => ConsoleState::Unauthenticated,
            (Some(_), None) => ConsoleState::Authenticated,
            (Some(_), Some(selection)) => ConsoleState::SessionSelected(selection.session_id),
        }
    }

    pub fn identity(&self) -> Option<&AdminIdentity> {
        self.auth.as_ref().map(|a| &a.identity)
    }

    /// Token to hand back to [`AdminConsole::resume`] later.
    pub fn access_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.access_token.as_str())
    }

    pub fn selected(&self) -> Option<SessionId> {
        self.selection.as_ref().map(|s| s.session_id)
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.auth
            .as_ref()
            .map(|a| a.list.snapshot())
            .unwrap_or_default()
    }

    /// Blocking alert from the session list, if its last load failed.
    pub fn list_notice(&self) -> Option<Notice> {
        self.auth.as_ref().and_then(|a| a.list.notice())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Checks the credentials and, on success, loads the session list and
    /// starts reconciliation.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        let authenticator = Arc::clone(&self.authenticator);
        let (username, password) = (username.to_string(), password.to_string());
        // Password hashing is CPU bound.
        let result = tokio::task::spawn_blocking(move || {
            authenticator.authenticate(&username, &password)
        })
        .await
        .map_err(|e| AuthError::Internal(e.into()))
        .and_then(|r| r);

        match result {
            Ok(grant) => {
                let identity = AdminIdentity {
                    username: grant.claims.sub.clone(),
                    token_id: grant.claims.jti.clone(),
                };
                self.enter(identity, grant.access_token).await;
                Ok(())
            }
            Err(err) => Err(self.deny(err)),
        }
    }

    /// Re-enters the authenticated state with a token issued earlier.
    pub async fn resume(&mut self, token: &str) -> Result<(), ClientError> {
        match self.authenticator.verify(token) {
            Ok(identity) => {
                self.enter(identity, token.to_string()).await;
                Ok(())
            }
            Err(err) => Err(self.deny(err)),
        }
    }

    /// Manual refresh of the session list.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let list = self.list()?;
        list.reconcile(ReconcileTrigger::Manual).await?;
        Ok(())
    }

    /// Takes ownership of a waiting session. Exactly one of several racing
    /// admins succeeds; the others get [`ClientError::AlreadyClaimed`].
    pub async fn claim(&mut self, id: SessionId) -> Result<ChatSession, ClientError> {
        let list = self.list()?;
        let outcome = match self.service.claim_session(id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(session_id = %id, error = %err, "Failed to claim chat session");
                self.notice = Some(Notice::from_store_error("Claiming session", &err));
                return Err(err.into());
            }
        };
        let _ = list.reconcile(ReconcileTrigger::Manual).await;

        match outcome {
            ClaimOutcome::Claimed(session) => Ok(session),
            ClaimOutcome::AlreadyClaimed(_) => {
                self.notice = Some(Notice::error(ClientError::AlreadyClaimed.to_string()));
                Err(ClientError::AlreadyClaimed)
            }
            ClaimOutcome::Closed(_) => {
                self.notice = Some(Notice::error(ClientError::SessionUnavailable.to_string()));
                Err(ClientError::SessionUnavailable)
            }
        }
    }

    /// Opens a session's thread, claiming it first if it is still waiting.
    ///
    /// The previous selection's subscription is released before the new one
    /// is established.
    pub async fn select(&mut self, id: SessionId) -> Result<(), ClientError> {
        let list = self.list()?;
        self.deselect();

        let session = match list.find(id) {
            Some(session) => session,
            None => match self.service.require_session(id).await {
                Ok(session) => session,
                Err(err) => {
                    self.notice = Some(Notice::from_store_error("Opening session", &err));
                    return Err(err.into());
                }
            },
        };
        match session.status {
            SessionStatus::Waiting => {
                self.claim(id).await?;
            }
            SessionStatus::Connected => {}
            SessionStatus::Closed => {
                self.notice = Some(Notice::error(ClientError::SessionUnavailable.to_string()));
                return Err(ClientError::SessionUnavailable);
            }
        }

        self.selection = Some(Selection {
            session_id: id,
            messages: self.service.subscribe(EventFilter::MessagesFor(id)),
        });
        tracing::debug!(session_id = %id, "Admin opened chat session");
        self.reload_history().await;
        Ok(())
    }

    pub fn deselect(&mut self) {
        if let Some(previous) = self.selection.take() {
            previous.messages.release();
        }
        self.transcript.clear();
        self.draft.clear();
    }

    /// Handles every message notification already queued for the selection.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = self.selection.as_mut().and_then(|s| s.messages.try_recv());
            let Some(notification) = next else {
                return handled;
            };
            self.handle_notification(notification).await;
            handled += 1;
        }
    }

    /// Waits for the next notification on the selected thread.
    pub async fn wait_for_update(&mut self) -> bool {
        let notification = match self.selection.as_mut() {
            Some(selection) => selection.messages.recv().await,
            None => return false,
        };
        match notification {
            Some(notification) => {
                self.handle_notification(notification).await;
                true
            }
            None => false,
        }
    }

    /// Applies one pushed notification; events for anything but the current
    /// selection are ignored.
    pub async fn handle_notification(&mut self, notification: Notification) {
        let Some(selected) = self.selected() else {
            return;
        };
        match notification {
            Notification::Change(ChangeEvent::MessageInserted(message))
                if message.session_id == selected =>
            {
                self.transcript.merge(message);
            }
            Notification::Change(_) => {}
            Notification::Resync => self.reload_history().await,
        }
    }

    /// Whether the reply control is enabled.
    pub fn can_send(&self) -> bool {
        self.selected().is_some() && normalize_message_content(&self.draft).is_ok()
    }

    /// Sends the draft as the expert. Allowed whenever a session is selected.
    pub async fn send_message(&mut self) -> Result<ChatMessage, ClientError> {
        let Some(session_id) = self.selected() else {
            return Err(ClientError::InvalidState("no session selected"));
        };
        let message = match NewMessage::new(session_id, Sender::Expert, &self.draft) {
            Ok(message) => message,
            Err(rejection) => {
                let err = ClientError::from_draft_rejection(&rejection);
                self.notice = Notice::from_draft_error(&err);
                return Err(err);
            }
        };

        match self.service.send_message(message).await {
            Ok(stored) => {
                self.draft.clear();
                self.transcript.merge(stored.clone());
                Ok(stored)
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to send expert message");
                self.notice = Some(Notice::from_store_error("Sending message", &err));
                Err(err.into())
            }
        }
    }

    /// Ends the selected conversation for both sides.
    pub async fn close_selected(&mut self) -> Result<ChatSession, ClientError> {
        let list = self.list()?;
        let Some(session_id) = self.selected() else {
            return Err(ClientError::InvalidState("no session selected"));
        };
        let outcome = match self.service.close_session(session_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to close chat session");
                self.notice = Some(Notice::from_store_error("Closing session", &err));
                return Err(err.into());
            }
        };
        self.deselect();
        let _ = list.reconcile(ReconcileTrigger::Manual).await;
        Ok(outcome.session().clone())
    }

    /// Stops reconciliation, drops the selection and forgets the token.
    pub async fn logout(&mut self) {
        self.deselect();
        if let Some(mut auth) = self.auth.take() {
            auth.reconciler.shutdown().await;
            tracing::info!(username = %auth.identity.username, "Admin signed out");
        }
        self.notice = None;
    }

    async fn enter(&mut self, identity: AdminIdentity, access_token: String) {
        if self.auth.is_some() {
            self.logout().await;
        }
        self.notice = None;
        let list = SessionList::new(self.service.clone());
        // A failed first load is recorded on the list and retried by the poll task.
        let _ = list.reconcile(ReconcileTrigger::Manual).await;
        let reconciler = Reconciler::spawn(list.clone(), self.poll_interval);
        self.auth = Some(AuthSession {
            identity,
            access_token,
            list,
            reconciler,
        });
    }

    fn deny(&mut self, err: AuthError) -> ClientError {
        tracing::warn!(error = %err, "Admin authentication failed");
        self.notice = Some(Notice::error(err.to_string()));
        ClientError::AccessDenied(err)
    }

    fn list(&self) -> Result<SessionList, ClientError> {
        self.auth
            .as_ref()
            .map(|a| a.list.clone())
            .ok_or(ClientError::NotAuthenticated)
    }

    async fn reload_history(&mut self) {
        let Some(session_id) = self.selected() else {
            return;
        };
        match self.service.list_messages(session_id).await {
            Ok(messages) => {
                self.transcript.merge_all(messages);
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to load chat history");
                self.notice = Some(Notice::from_store_error("Loading messages", &err));
            }
        }
    }
}
