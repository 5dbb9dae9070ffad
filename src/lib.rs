//! # RoomMatch
//!
//! Client for the RoomMatch roommate-matching service: session handling,
//! the REST client, the chat transport and headless view models.
//!
//! ## Modules
//!
//! - [`session`]: Authenticated identity, persisted across runs
//! - [`api`]: REST client for the backend
//! - [`chat`]: Per-conversation WebSocket channels
//! - [`views`]: State and actions for each screen
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roommatch::{ApiClient, Config, FileStorage, SessionManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!
//!     let storage = Arc::new(FileStorage::new(config.session.storage_path()));
//!     let session = Arc::new(SessionManager::new(storage));
//!     session.rehydrate().await;
//!
//!     let client = ApiClient::new(config.api.clone(), Arc::clone(&session))?;
//!     if !session.current_session().is_authenticated() {
//!         client.authenticate("a@mymail.pomona.edu", "secret").await?;
//!     }
//!
//!     let matches = client.list_matches().await?;
//!     println!("You have {} matches", matches.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod session;
pub mod views;

// Re-export top-level types for convenience
pub use api::{ApiClient, ApiError, ApiResult, ValidationError};

pub use session::{
    FileStorage, MemoryStorage, Session, SessionError, SessionManager, SessionState,
    SessionStorage,
};

pub use chat::{ChatChannel, ChatError, ChatEvent, ChatHistory, ConversationId, ReconnectPolicy};

pub use config::{Config, ConfigError, LoggingConfig};
