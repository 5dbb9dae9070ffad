//! API Error Types
//!
//! Errors returned by the API client, and the mapping from backend error
//! bodies to user-facing text.

use thiserror::Error;

/// Input rejected before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please answer all {expected} questions ({actual} answered)")]
    IncompleteQuestionnaire { expected: usize, actual: usize },

    #[error("Answer to question {question} must be between 1 and 7 (got {value})")]
    AnswerOutOfRange { question: usize, value: u8 },

    #[error("There is no question {0}")]
    UnknownQuestion(usize),

    #[error("Message cannot be empty")]
    EmptyMessage,
}

/// API client error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Blocked client-side, no request was made
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The operation needs a session and there is none
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The operation needs the admin flag
    #[error("Admin access required")]
    Forbidden,

    /// The server rejected the bearer token; the session has been cleared
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Non-success status with a server message
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection, TLS or timeout failure
    #[error("Backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// 2xx response whose body didn't parse
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client could not be constructed
    #[error("Client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::NotAuthenticated => "Please log in to continue.".to_string(),
            ApiError::Forbidden => "Admin access required.".to_string(),
            ApiError::Unauthorized(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Unreachable(_) | ApiError::InvalidResponse(_) | ApiError::Setup(_) => {
                "Server error. Please try again.".to_string()
            }
        }
    }

    /// Whether the caller should send the user back to the login screen
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated | ApiError::Unauthorized(_))
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"detail": "..."}`, `{"detail": [{"msg": "..."}]}` and
/// `{"message": "..."}`.
pub fn extract_server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => return Some(detail.clone()),
        Some(serde_json::Value::Array(items)) => {
            if let Some(msg) = items
                .iter()
                .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
            {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Result type for API client calls
pub type ApiResult<T> = Result<T, ApiError>;
