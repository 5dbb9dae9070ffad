//! Session Manager
//!
//! Owns the authenticated identity of the running client. The state lives in
//! a `watch` channel so views can observe login and logout without polling.
//! Transitions are serialized, so storage and the in-memory state always
//! describe the same session.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use super::error::{SessionError, SessionResult};
use super::storage::{SessionStorage, ACCESS_TOKEN_KEY, USER_ID_KEY};
use super::token::decode_claims;

/// An authenticated session
///
/// Token and user id are always present together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    /// Derived from the token's admin claim; false when the token can't be read
    pub is_admin: bool,
}

impl Session {
    /// Build a session, deriving the admin flag from the token claims
    fn from_credentials(token: String, user_id: String) -> Self {
        let is_admin = match decode_claims(&token) {
            Ok(claims) => claims.is_admin(),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not decode access token; treating as non-admin");
                false
            }
        };

        Self {
            token,
            user_id,
            is_admin,
        }
    }
}

/// Snapshot of the session as seen by views
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted storage has not been read yet
    #[default]
    Loading,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(|s| s.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session().map(|s| s.user_id.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.session().map(|s| s.is_admin).unwrap_or(false)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }
}

/// Holds and persists the current session
pub struct SessionManager {
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionState>,
    transitions: Mutex<()>,
}

impl SessionManager {
    /// Create a manager in the `Loading` state; call [`rehydrate`](Self::rehydrate) next
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            storage,
            state,
            transitions: Mutex::new(()),
        }
    }

    /// Restore the session from persisted storage
    pub async fn rehydrate(&self) -> SessionState {
        let _guard = self.transitions.lock().await;
        let token = self.read_key(ACCESS_TOKEN_KEY).await;
        let user_id = self.read_key(USER_ID_KEY).await;

        let next = match (token, user_id) {
            (Some(token), Some(user_id)) => {
                let session = Session::from_credentials(token, user_id);
                tracing::info!(user_id = %session.user_id, is_admin = session.is_admin, "Session restored");
                SessionState::Authenticated(session)
            }
            (None, None) => {
                tracing::debug!("No persisted session");
                SessionState::Anonymous
            }
            (token, _) => {
                let stray = if token.is_some() {
                    ACCESS_TOKEN_KEY
                } else {
                    USER_ID_KEY
                };
                tracing::warn!(key = stray, "Discarding partial persisted session");
                self.clear_storage().await;
                SessionState::Anonymous
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    /// Record a successful authentication
    pub async fn login(
        &self,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> SessionResult<Session> {
        let token = token.into();
        let user_id = user_id.into();

        if token.is_empty() {
            return Err(SessionError::Incomplete(ACCESS_TOKEN_KEY));
        }
        if user_id.is_empty() {
            return Err(SessionError::Incomplete(USER_ID_KEY));
        }

        let session = Session::from_credentials(token, user_id);

        let _guard = self.transitions.lock().await;
        if let Err(e) = self.storage.set(ACCESS_TOKEN_KEY, &session.token).await {
            tracing::error!(error = %e, "Failed to persist access token");
        }
        if let Err(e) = self.storage.set(USER_ID_KEY, &session.user_id).await {
            tracing::error!(error = %e, "Failed to persist user id");
        }

        tracing::info!(user_id = %session.user_id, is_admin = session.is_admin, "Logged in");
        self.state
            .send_replace(SessionState::Authenticated(session.clone()));
        Ok(session)
    }

    /// Clear the session and persisted values
    pub async fn logout(&self) {
        let _guard = self.transitions.lock().await;
        self.reset().await;
    }

    /// Drop the session after the server rejected its token
    pub async fn invalidate(&self, reason: &str) {
        let _guard = self.transitions.lock().await;
        tracing::warn!(reason = reason, "Session invalidated");
        self.reset().await;
    }

    /// Drop the session only if it still holds `token`
    ///
    /// Returns false when `token` belongs to a session that has already been
    /// replaced or ended; the current session is left alone.
    pub async fn invalidate_if(&self, token: &str, reason: &str) -> bool {
        let _guard = self.transitions.lock().await;
        if self.state.borrow().token() != Some(token) {
            tracing::debug!(reason = reason, "Ignoring rejection of a replaced token");
            return false;
        }
        tracing::warn!(reason = reason, "Session invalidated");
        self.reset().await;
        true
    }

    /// In-memory snapshot of the current state
    pub fn current_session(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn reset(&self) {
        self.clear_storage().await;
        let previous = self.state.send_replace(SessionState::Anonymous);
        if let Some(session) = previous.session() {
            tracing::info!(user_id = %session.user_id, "Logged out");
        }
    }

    async fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::error!(key = key, error = %e, "Failed to read persisted session");
                None
            }
        }
    }

    async fn clear_storage(&self) {
        for key in [ACCESS_TOKEN_KEY, USER_ID_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::error!(key = key, error = %e, "Failed to clear persisted session");
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use crate::session::token::encode_test_token;
    use serde_json::json;

    fn manager_with(storage: Arc<MemoryStorage>) -> SessionManager {
        SessionManager::new(storage)
    }

    fn assert_invariant(state: &SessionState) {
        match state {
            SessionState::Authenticated(s) => {
                assert!(!s.token.is_empty());
                assert!(!s.user_id.is_empty());
            }
            other => {
                assert!(other.token().is_none());
                assert!(other.user_id().is_none());
                assert!(!other.is_admin());
            }
        }
    }

    #[tokio::test]
    async fn test_starts_loading_until_rehydrated() {
        let manager = manager_with(Arc::new(MemoryStorage::new()));
        assert!(manager.current_session().is_loading());

        let state = manager.rehydrate().await;
        assert_eq!(state, SessionState::Anonymous);
        assert_eq!(manager.current_session(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_persists_and_logout_clears() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager_with(storage.clone());
        manager.rehydrate().await;

        let session = manager.login("t1", "42").await.unwrap();
        assert_eq!(
            session,
            Session {
                token: "t1".into(),
                user_id: "42".into(),
                is_admin: false,
            }
        );
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("t1"));
        assert_eq!(storage.get(USER_ID_KEY).await.unwrap().as_deref(), Some("42"));

        // Stable across reads
        assert_eq!(manager.current_session().session(), Some(&session));
        assert_eq!(manager.current_session().session(), Some(&session));

        manager.logout().await;
        assert_eq!(manager.current_session(), SessionState::Anonymous);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_admin_claim_sets_flag() {
        let manager = manager_with(Arc::new(MemoryStorage::new()));
        let token = encode_test_token(json!({ "sub": "a@x.edu", "user_id": 1, "is_admin": true }));

        let session = manager.login(token, "1").await.unwrap();
        assert!(session.is_admin);
        assert!(manager.current_session().is_admin());
    }

    #[tokio::test]
    async fn test_invalid_token_is_not_admin() {
        let manager = manager_with(Arc::new(MemoryStorage::new()));
        let session = manager.login("not-a-jwt", "1").await.unwrap();
        assert!(!session.is_admin);
        assert!(manager.current_session().is_authenticated());
    }

    #[tokio::test]
    async fn test_incomplete_login_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager_with(storage.clone());
        manager.rehydrate().await;

        assert!(matches!(
            manager.login("", "42").await,
            Err(SessionError::Incomplete(ACCESS_TOKEN_KEY))
        ));
        assert!(matches!(
            manager.login("t1", "").await,
            Err(SessionError::Incomplete(USER_ID_KEY))
        ));
        assert_eq!(manager.current_session(), SessionState::Anonymous);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_rehydrate_restores_session() {
        let token = encode_test_token(json!({ "is_admin": true }));
        let storage = Arc::new(MemoryStorage::with_entries([
            (ACCESS_TOKEN_KEY, token.as_str()),
            (USER_ID_KEY, "9"),
        ]));
        let manager = manager_with(storage);

        let state = manager.rehydrate().await;
        assert_eq!(state.user_id(), Some("9"));
        assert!(state.is_admin());
    }

    #[tokio::test]
    async fn test_rehydrate_discards_partial_session() {
        let storage = Arc::new(MemoryStorage::with_entries([(ACCESS_TOKEN_KEY, "t1")]));
        let manager = manager_with(storage.clone());

        assert_eq!(manager.rehydrate().await, SessionState::Anonymous);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_behaves_like_logout() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager_with(storage.clone());
        manager.login("t1", "42").await.unwrap();

        manager.invalidate("401 from /user-profile").await;
        assert_eq!(manager.current_session(), SessionState::Anonymous);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_if_ignores_replaced_token() {
        let storage = Arc::new(MemoryStorage::new());
        let manager = manager_with(storage.clone());
        manager.login("old", "1").await.unwrap();
        manager.logout().await;
        manager.login("new", "2").await.unwrap();

        assert!(!manager.invalidate_if("old", "late 401").await);
        assert_eq!(manager.current_session().token(), Some("new"));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).await.unwrap().as_deref(), Some("new"));

        assert!(manager.invalidate_if("new", "401").await);
        assert_eq!(manager.current_session(), SessionState::Anonymous);
        assert!(storage.is_empty().await);

        assert!(!manager.invalidate_if("new", "401 again").await);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let manager = manager_with(Arc::new(MemoryStorage::new()));
        let mut rx = manager.subscribe();

        manager.login("t1", "42").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().user_id(), Some("42"));

        manager.logout().await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_invariant_across_sequences() {
        let manager = manager_with(Arc::new(MemoryStorage::new()));
        let admin = encode_test_token(json!({ "is_admin": true }));

        let steps: Vec<Option<(&str, &str)>> = vec![
            Some(("t1", "1")),
            None,
            None,
            Some((admin.as_str(), "2")),
            Some(("", "3")),
            Some(("t4", "")),
            Some(("t5", "5")),
            None,
        ];

        for step in steps {
            match step {
                Some((token, user)) => {
                    let _ = manager.login(token, user).await;
                }
                None => manager.logout().await,
            }
            assert_invariant(&manager.current_session());
        }
    }
}
