use std::collections::HashSet;

use crate::models::ChatMessage;
use crate::types::MessageId;

/// Local, ordered and de-duplicated copy of a session's messages.
///
/// Pushed inserts and full reloads may arrive in any order and may overlap;
/// after any mix of them the contents equal the sorted set of every message
/// seen. Reloads merge, they never truncate: messages are never deleted in the
/// store, so anything already seen stays valid.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    ids: HashSet<MessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the message was not seen before.
    pub fn merge(&mut self, message: ChatMessage) -> bool {
        if !self.ids.insert(message.id) {
            return false;
        }
        let key = message.ordering_key();
        let at = self
            .messages
            .partition_point(|existing| existing.ordering_key() < key);
        self.messages.insert(at, message);
        true
    }

    /// Merges a batch and returns how many were new.
    pub fn merge_all<I>(&mut self, messages: I) -> usize
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        messages
            .into_iter()
            .map(|m| self.merge(m))
            .filter(|added| *added)
            .count()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }
}
