//! Chat view
//!
//! Stored history comes over REST; live messages are merged from the chat
//! channel as they arrive. When no channel is open, sends fall back to
//! the REST endpoint and are shown immediately.

use super::scope::ViewScope;
use crate::api::dto::{ChatMessage, Profile};
use crate::api::{ApiClient, ApiError};
use crate::chat::{
    ChannelState, ChatChannel, ChatError, ChatEvent, ChatHistory, ConversationId, MessageOrigin,
    ReconnectPolicy,
};

#[derive(Debug)]
pub struct ChatView {
    conversation: ConversationId,
    peer: Option<Profile>,
    history: ChatHistory,
    channel: Option<ChatChannel>,
    error: Option<String>,
    scope: ViewScope,
}

impl ChatView {
    pub fn new(conversation: ConversationId) -> Self {
        Self {
            conversation,
            peer: None,
            history: ChatHistory::new(),
            channel: None,
            error: None,
            scope: ViewScope::new(),
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    /// The other participant's profile, once loaded
    pub fn peer(&self) -> Option<&Profile> {
        self.peer.as_ref()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn channel_state(&self) -> Option<ChannelState> {
        self.channel.as_ref().map(|c| c.state())
    }

    /// Load the peer's profile and the stored conversation
    pub async fn load(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        let user_id = self.conversation.user_id.clone();
        let peer_id = self.conversation.peer_id.clone();

        let result = self
            .scope
            .run(async {
                tokio::join!(
                    client.fetch_match_profile(&peer_id),
                    client.list_messages(&user_id, &peer_id)
                )
            })
            .await;

        let Some((peer, messages)) = result else {
            return false;
        };

        match peer {
            Ok(profile) => self.peer = Some(profile),
            Err(e) => tracing::warn!(peer_id = %peer_id, error = %e, "Failed to load chat partner"),
        }

        match messages {
            Ok(messages) => {
                self.history = ChatHistory::from_server(messages, &user_id);
                true
            }
            Err(e) => {
                tracing::warn!(peer_id = %peer_id, error = %e, "Failed to load chat history");
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Open the live channel; replaces any previous one
    pub fn connect(&mut self, client: &ApiClient, policy: ReconnectPolicy) -> Result<(), ChatError> {
        let url = client.chat_socket_url(&self.conversation)?;
        if let Some(old) = self.channel.take() {
            old.close();
        }
        self.channel = Some(ChatChannel::open(url, self.conversation.clone(), policy));
        Ok(())
    }

    /// Send over the channel when one is usable, otherwise over REST
    pub async fn send(&mut self, client: &ApiClient, content: &str) -> Result<(), ApiError> {
        self.error = None;

        if let Some(channel) = self.channel.as_ref() {
            match channel.send(content) {
                Ok(_) => {
                    self.drain_pending();
                    return Ok(());
                }
                Err(ChatError::EmptyMessage) => {
                    return Err(crate::api::ValidationError::EmptyMessage.into());
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Chat channel unavailable, sending over REST");
                }
            }
        }

        if content.trim().is_empty() {
            return Err(crate::api::ValidationError::EmptyMessage.into());
        }

        self.history.push(
            MessageOrigin::Local,
            ChatMessage {
                sender: self.conversation.user_id.clone(),
                content: content.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        );

        let result = self
            .scope
            .run(client.send_message(
                &self.conversation.user_id,
                &self.conversation.peer_id,
                content,
            ))
            .await;

        match result {
            None | Some(Ok(_)) => Ok(()),
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Wait for the next channel event and fold it into the history
    ///
    /// `None` when there is no channel, it has closed, or the view unmounted.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let channel = self.channel.as_mut()?;
        let event = self.scope.run(channel.next_event()).await.flatten()?;
        self.record(&event);
        Some(event)
    }

    /// Fold every event that is already queued; returns how many were applied
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.channel.as_mut().and_then(|c| c.try_next_event()) {
            self.record(&event);
            applied += 1;
        }
        applied
    }

    pub fn close(&mut self) {
        if let Some(channel) = &self.channel {
            channel.close();
        }
    }

    fn record(&mut self, event: &ChatEvent) {
        self.history.apply(event);
        if let ChatEvent::Closed { reason } = event {
            tracing::debug!(reason = ?reason, "Chat view lost its channel");
        }
    }
}
