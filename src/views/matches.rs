//! Match list
//!
//! Expansion is local UI state keyed by match id. Reloading the list keeps
//! rows expanded as long as the match is still present.

use std::collections::HashSet;

use super::scope::ViewScope;
use crate::api::dto::{Match, MatchNotification};
use crate::api::ApiClient;
use crate::chat::ConversationId;

#[derive(Debug, Default)]
pub struct MatchListView {
    matches: Vec<Match>,
    expanded: HashSet<String>,
    notification: Option<MatchNotification>,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    scope: ViewScope,
}

impl MatchListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn notification(&self) -> Option<&MatchNotification> {
        self.notification.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub async fn load(&mut self, client: &ApiClient) -> bool {
        self.loading = true;
        self.error = None;
        let result = self.scope.run(client.list_matches()).await;
        self.loading = false;

        match result {
            None => false,
            Some(Ok(matches)) => {
                self.expanded
                    .retain(|id| matches.iter().any(|m| &m.match_id == id));
                self.matches = matches;
                true
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Failed to load matches");
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Flip a row; returns the new expanded state
    pub fn toggle(&mut self, match_id: &str) -> bool {
        if self.expanded.remove(match_id) {
            false
        } else {
            self.expanded.insert(match_id.to_string());
            true
        }
    }

    pub fn expand(&mut self, match_id: &str) {
        self.expanded.insert(match_id.to_string());
    }

    pub fn collapse(&mut self, match_id: &str) {
        self.expanded.remove(match_id);
    }

    pub fn is_expanded(&self, match_id: &str) -> bool {
        self.expanded.contains(match_id)
    }

    /// Conversation to open when the user picks "chat" on a match
    pub fn chat_target(&self, match_id: &str) -> Option<ConversationId> {
        self.matches
            .iter()
            .find(|m| m.match_id == match_id)
            .map(|m| ConversationId::new(m.user_id.clone(), m.match_id.clone()))
    }

    /// Ask the backend whether a new match is waiting
    pub async fn check_notification(&mut self, client: &ApiClient) -> bool {
        match self.scope.run(client.match_notification()).await {
            None => false,
            Some(Ok(notification)) => {
                self.notification = Some(notification);
                true
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "No match notification");
                self.notification = None;
                false
            }
        }
    }

    pub async fn request_new_match(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        self.notice = None;
        match self.scope.run(client.request_new_match()).await {
            None => false,
            Some(Ok(response)) => {
                self.notice = Some(response.message);
                true
            }
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                false
            }
        }
    }

    #[cfg(test)]
    fn with_matches(matches: Vec<Match>) -> Self {
        Self {
            matches,
            ..Self::default()
        }
    }
}
