//! Admin dashboard
//!
//! Shown only when the session carries the admin claim. The backend
//! still checks every admin call.

use super::scope::ViewScope;
use crate::api::dto::{Pairing, UserStatus};
use crate::api::{ApiClient, ApiError};

pub const MATCHING_NOTICE: &str = "Matching successful!";

#[derive(Debug, Default)]
pub struct AdminDashboard {
    status: Option<UserStatus>,
    pairings: Vec<Pairing>,
    loading: bool,
    error: Option<String>,
    notice: Option<String>,
    scope: ViewScope,
}

impl AdminDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<&UserStatus> {
        self.status.as_ref()
    }

    pub fn pairings(&self) -> &[Pairing] {
        &self.pairings
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

    /// Whether the dashboard should be shown at all
    pub fn is_visible(client: &ApiClient) -> bool {
        client.session().current_session().is_admin()
    }

    /// Load user counts, then current pairings
    pub async fn load(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        if !Self::is_visible(client) {
            self.error = Some(ApiError::Forbidden.user_message());
            return false;
        }

        match self.scope.run(client.admin_user_status()).await {
            None => return false,
            Some(Ok(status)) => self.status = Some(status),
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                return false;
            }
        }

        match self.scope.run(client.admin_pairings()).await {
            None => false,
            Some(Ok(pairings)) => {
                self.pairings = pairings;
                true
            }
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                false
            }
        }
    }

    /// Trigger a matching run and refresh the dashboard
    pub async fn run_matching(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        self.notice = None;
        self.loading = true;

        let result = self.scope.run(client.admin_match_users()).await;
        let ok = match result {
            None => false,
            Some(Ok(pairings)) => {
                self.pairings = pairings;
                self.notice = Some(MATCHING_NOTICE.to_string());
                true
            }
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                false
            }
        };

        if ok {
            self.load(client).await;
        }
        self.loading = false;
        ok
    }
}
