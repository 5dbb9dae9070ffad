//! Append-only chat log

use super::events::{ChatEvent, MessageOrigin};
use crate::api::dto::ChatMessage;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub origin: MessageOrigin,
    pub message: ChatMessage,
}

/// Messages in the order they were seen; never reordered or deduplicated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from stored messages, tagging those sent by `local_user` as local
    pub fn from_server(messages: Vec<ChatMessage>, local_user: &str) -> Self {
        let entries = messages
            .into_iter()
            .map(|message| HistoryEntry {
                origin: if message.sender == local_user {
                    MessageOrigin::Local
                } else {
                    MessageOrigin::Remote
                },
                message,
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, origin: MessageOrigin, message: ChatMessage) {
        self.entries.push(HistoryEntry { origin, message });
    }

    /// Fold one event; returns whether a message was appended
    pub fn apply(&mut self, event: &ChatEvent) -> bool {
        match event {
            ChatEvent::Sent(message) => self.push(MessageOrigin::Local, message.clone()),
            ChatEvent::Received(message) => self.push(MessageOrigin::Remote, message.clone()),
            _ => return false,
        }
        true
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
