//! Chat events
//!
//! Everything a chat channel reports is a [`ChatEvent`]. Views fold these
//! into a [`ChatHistory`](super::ChatHistory).

use std::time::Duration;

use crate::api::dto::ChatMessage;

/// Whether a message was written here or arrived from the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    Local,
    Remote,
}

/// The two participants of a conversation, from the local user's side
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId {
    pub user_id: String,
    pub peer_id: String,
}

impl ConversationId {
    pub fn new(user_id: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            peer_id: peer_id.into(),
        }
    }

    /// Socket path `/chat/{user}/{peer}`
    pub fn path(&self) -> String {
        format!(
            "/chat/{}/{}",
            urlencoding::encode(&self.user_id),
            urlencoding::encode(&self.peer_id)
        )
    }
}

/// Why a channel closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// `close()` was called or the channel was dropped
    Local,
    /// The server closed the socket, with its reason if given
    Remote(Option<String>),
    /// The socket failed mid-conversation
    Error(String),
    /// The socket could never be opened
    ConnectFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Opened,
    Sent(ChatMessage),
    Received(ChatMessage),
    Reconnecting { attempt: u32, delay: Duration },
    Closed { reason: CloseReason },
}

impl ChatEvent {
    pub fn is_closed(&self) -> bool {
        matches!(self, ChatEvent::Closed { .. })
    }
}
