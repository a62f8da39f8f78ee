//! The visitor's support widget.
//!
//! ```text
//! idle --open--> prompt --request--> requesting --ok--> waiting --claimed--> connected
//!   ^                ^                    |                |                    |
//!   |                +------error---------+                +---ended by admin---+--> prompt
//!   +----------------------------- close / end_chat (from anywhere) -------------+
//! ```
//!
//! `connected` is only ever entered because the store reported the session as
//! connected, either through the status subscription or the one-off re-read
//! done right after subscribing.

use crate::clients::{ClientError, Notice, Transcript};
use crate::models::{ChatMessage, ChatSession, NewMessage, Sender, SessionStatus};
use crate::services::{ChangeEvent, ChatService, EventFilter, Notification, Subscription};
use crate::types::SessionId;
use crate::validation::normalize_message_content;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    /// Collapsed.
    Idle,
    /// Open, no session yet.
    Prompt,
    /// Session creation in flight.
    Requesting,
    /// Session exists, no admin yet.
    Waiting,
    /// An admin claimed the session; messages can be sent.
    Connected,
}

impl WidgetState {
    fn label(&self) -> &'static str {
        match self {
            WidgetState::Idle => "idle",
            WidgetState::Prompt => "prompt",
            WidgetState::Requesting => "requesting",
            WidgetState::Waiting => "waiting",
            WidgetState::Connected => "connected",
        }
    }
}

/// The session this widget is attached to plus its two live subscriptions.
/// Dropping it releases both.
struct ActiveChat {
    session_id: SessionId,
    status_sub: Subscription,
    message_sub: Subscription,
}

pub struct VisitorWidget {
    service: ChatService,
    guest_name: String,
    state: WidgetState,
    chat: Option<ActiveChat>,
    transcript: Transcript,
    draft: String,
    notice: Option<Notice>,
    scroll_ticks: u64,
}

impl VisitorWidget {
    pub fn new(service: ChatService, guest_name: impl Into<String>) -> Self {
        Self {
            service,
            guest_name: guest_name.into(),
            state: WidgetState::Idle,
            chat: None,
            transcript: Transcript::new(),
            draft: String::new(),
            notice: None,
            scroll_ticks: 0,
        }
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.chat.as_ref().map(|c| c.session_id)
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

    /// Bumped every time a new message is appended; the view scrolls to the bottom on change.
    pub fn scroll_ticks(&self) -> u64 {
        self.scroll_ticks
    }

    /// Whether the send control is enabled.
    pub fn can_send(&self) -> bool {
        self.state == WidgetState::Connected && normalize_message_content(&self.draft).is_ok()
    }

    pub fn open(&mut self) {
        if self.state == WidgetState::Idle {
            self.state = WidgetState::Prompt;
        }
    }

    /// Collapses the widget from any state. The session is abandoned, not
    /// closed: the store is not told, and the next request creates a new one.
    pub fn close(&mut self) {
        if let Some(chat) = self.chat.take() {
            tracing::debug!(session_id = %chat.session_id, "Visitor abandoned chat session");
        }
        self.transcript.clear();
        self.draft.clear();
        self.notice = None;
        self.state = WidgetState::Idle;
    }

    /// Asks for an expert: creates a fresh `waiting` session and starts watching it.
    pub async fn request_support(&mut self) -> Result<SessionId, ClientError> {
        if self.state != WidgetState::Prompt {
            return Err(ClientError::InvalidState(self.state.label()));
        }
        self.state = WidgetState::Requesting;
        self.notice = None;

        let session = match self.service.create_session(&self.guest_name).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to create chat session");
                self.notice = Some(Notice::from_store_error("Requesting support", &err));
                self.state = WidgetState::Prompt;
                return Err(err.into());
            }
        };

        let session_id = session.id;
        self.chat = Some(ActiveChat {
            session_id,
            status_sub: self.service.subscribe(EventFilter::SessionRow(session_id)),
            message_sub: self.service.subscribe(EventFilter::MessagesFor(session_id)),
        });
        self.transcript.clear();
        self.state = WidgetState::Waiting;

        // A claim may have landed between the insert and the subscriptions.
        self.refresh_status().await;
        Ok(session_id)
    }

    /// Handles every notification already queued on the subscriptions.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.chat.as_mut() {
                Some(chat) => chat
                    .status_sub
                    .try_recv()
                    .or_else(|| chat.message_sub.try_recv()),
                None => None,
            };
            let Some(notification) = next else {
                return handled;
            };
            self.handle_notification(notification).await;
            handled += 1;
        }
    }

    /// Waits for the next notification and applies it. `false` when there is
    /// nothing to wait on.
    pub async fn wait_for_update(&mut self) -> bool {
        let notification = {
            let Some(chat) = self.chat.as_mut() else {
                return false;
            };
            tokio::select! {
                n = chat.status_sub.recv() => n,
                n = chat.message_sub.recv() => n,
            }
        };
        match notification {
            Some(notification) => {
                self.handle_notification(notification).await;
                true
            }
            None => false,
        }
    }

    /// Applies one pushed notification. Safe in any state: events for a
    /// session this widget no longer watches are ignored.
    pub async fn handle_notification(&mut self, notification: Notification) {
        let Some(current) = self.session_id() else {
            return;
        };
        match notification {
            Notification::Change(ChangeEvent::SessionUpdated(session)) if session.id == current => {
                self.apply_status(session).await;
            }
            Notification::Change(ChangeEvent::MessageInserted(message))
                if message.session_id == current =>
            {
                // Before connect the post-connect reload picks these up.
                if self.state == WidgetState::Connected {
                    self.append(message);
                }
            }
            Notification::Change(_) => {}
            Notification::Resync => match self.state {
                WidgetState::Connected => self.reload_history().await,
                WidgetState::Waiting => self.refresh_status().await,
                _ => {}
            },
        }
    }

    pub async fn send_message(&mut self) -> Result<ChatMessage, ClientError> {
        if self.state != WidgetState::Connected {
            return Err(ClientError::InvalidState(self.state.label()));
        }
        let Some(session_id) = self.session_id() else {
            return Err(ClientError::InvalidState(self.state.label()));
        };
        let message = match NewMessage::new(session_id, Sender::User, &self.draft) {
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
                self.append(stored.clone());
                Ok(stored)
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to send visitor message");
                self.notice = Some(Notice::from_store_error("Sending message", &err));
                Err(err.into())
            }
        }
    }

    /// Ends the conversation for both sides: marks the session closed, then
    /// collapses the widget.
    pub async fn end_chat(&mut self) -> Result<(), ClientError> {
        let Some(session_id) = self.session_id() else {
            self.close();
            return Ok(());
        };
        if let Err(err) = self.service.close_session(session_id).await {
            tracing::warn!(session_id = %session_id, error = %err, "Failed to close chat session");
            self.notice = Some(Notice::from_store_error("Ending chat", &err));
            return Err(err.into());
        }
        self.close();
        Ok(())
    }

    async fn apply_status(&mut self, session: ChatSession) {
        match session.status {
            SessionStatus::Connected if self.state == WidgetState::Waiting => {
                tracing::info!(session_id = %session.id, "Expert joined chat session");
                self.state = WidgetState::Connected;
                self.reload_history().await;
            }
            SessionStatus::Closed => {
                tracing::info!(session_id = %session.id, "Chat session ended");
                self.chat = None;
                self.transcript.clear();
                self.draft.clear();
                self.state = WidgetState::Prompt;
                self.notice = Some(Notice::info("The support chat has ended."));
            }
            _ => {}
        }
    }

    async fn refresh_status(&mut self) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        match self.service.find_session(session_id).await {
            Ok(Some(session)) => self.apply_status(session).await,
            Ok(None) => {
                tracing::warn!(session_id = %session_id, "Chat session disappeared from store");
            }
            Err(err) => {
                // The subscription still delivers the status change later.
                tracing::warn!(session_id = %session_id, error = %err, "Failed to re-read session status");
            }
        }
    }

    async fn reload_history(&mut self) {
        let Some(session_id) = self.session_id() else {
            return;
        };
        match self.service.list_messages(session_id).await {
            Ok(messages) => {
                if self.transcript.merge_all(messages) > 0 {
                    self.scroll_ticks += 1;
                }
            }
            Err(err) => {
                tracing::warn!(session_id = %session_id, error = %err, "Failed to load chat history");
                self.notice = Some(Notice::from_store_error("Loading messages", &err));
            }
        }
    }

    fn append(&mut self, message: ChatMessage) {
        if self.transcript.merge(message) {
            self.scroll_ticks += 1;
        }
    }
}
