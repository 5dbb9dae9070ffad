//! Login and registration forms

use super::scope::ViewScope;
use crate::api::ApiClient;
use crate::session::Session;

/// Schools offered as suggestions on the registration form
pub const SCHOOLS: [&str; 10] = [
    "Pomona College",
    "Harvey Mudd College",
    "Claremont McKenna College",
    "Scripps College",
    "Pitzer College",
    "Stanford University",
    "UC Berkeley",
    "MIT",
    "Harvard University",
    "Other",
];

const REQUIRED_FIELDS: &str = "All fields are required.";

/// Schools whose name contains `input`, ignoring case; empty input suggests nothing
pub fn matching_schools(input: &str) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    SCHOOLS
        .iter()
        .copied()
        .filter(|school| school.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    error: Option<String>,
    scope: ViewScope,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    /// Authenticate; on success the session manager holds the new session
    pub async fn submit(&mut self, client: &ApiClient) -> Option<Session> {
        self.error = None;
        if self.email.trim().is_empty() || self.password.is_empty() {
            self.error = Some(REQUIRED_FIELDS.to_string());
            return None;
        }

        let result = self
            .scope
            .run(client.authenticate(&self.email, &self.password))
            .await?;

        match result {
            Ok(session) => Some(session),
            Err(e) => {
                self.error = Some(e.user_message());
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub school: String,
    error: Option<String>,
    notice: Option<String>,
    scope: ViewScope,
}

impl RegisterForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Server message after a successful registration
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Suggestions for the school typed so far
    pub fn school_suggestions(&self) -> Vec<&'static str> {
        matching_schools(&self.school)
    }

    /// Replace the school with a suggestion
    pub fn pick_school(&mut self, school: &str) {
        self.school = school.to_string();
    }

    /// Create the account; returns true on success
    pub async fn submit(&mut self, client: &ApiClient) -> bool {
        self.error = None;
        self.notice = None;

        if self.email.trim().is_empty() || self.password.is_empty() || self.school.trim().is_empty() {
            self.error = Some(REQUIRED_FIELDS.to_string());
            return false;
        }

        let result = self
            .scope
            .run(client.register(&self.email, &self.password, &self.school))
            .await;

        match result {
            None => false,
            Some(Ok(response)) if response.success => {
                self.notice = Some(response.message);
                true
            }
            Some(Ok(response)) => {
                self.error = Some(response.message);
                false
            }
            Some(Err(e)) => {
                self.error = Some(e.user_message());
                false
            }
        }
    }
}
