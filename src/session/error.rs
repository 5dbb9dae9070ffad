//! Session error types
//!
//! Errors raised by session storage backends and the session manager.

use thiserror::Error;

/// Errors that can occur while reading or writing session state
#[derive(Error, Debug)]
pub enum SessionError {
    /// I/O operation on the backing store failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted session file could not be parsed or written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A login was attempted without both a token and a user id
    #[error("Incomplete credentials: {0} is empty")]
    Incomplete(&'static str),
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
