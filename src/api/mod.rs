//! RoomMatch REST API
//!
//! Client for the RoomMatch backend.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /register` - Create an account
//! - `POST /token` - Exchange credentials for a bearer token
//! - `POST /logout` - End the server-side session
//!
//! ## Profile
//! - `GET /user-profile` - Own profile
//! - `POST /update-profile` - Multipart profile update
//! - `GET /prompts` - Prompt texts for the profile page
//! - `GET /user-profile/:id` - Another user's profile
//!
//! ## Questionnaire
//! - `GET /questionnaire/get-responses` - Stored answers
//! - `POST /questionnaire/submit-questionnaire` - Submit 25 answers
//!
//! ## Matches
//! - `GET /match-results` - Matches with scores
//! - `POST /match/notify` - New match notification
//! - `POST /request-new-match` - Ask for a different match
//!
//! ## Chat
//! - `GET /chat/messages/:user/:match` - Stored conversation
//! - `POST /chat/messages/:user/:match` - Send a message
//! - `GET /chat/:user/:match` - WebSocket (see [`crate::chat`])
//!
//! ## Admin
//! - `GET /admin/user-status` - Matched/unmatched counts
//! - `POST /admin/match-users` - Run matching
//! - `GET /matches` - Current pairings
//!
//! # Example
//!
//! ```rust,ignore
//! use roommatch::api::ApiClient;
//! use roommatch::config::ApiConfig;
//! use roommatch::session::{MemoryStorage, SessionManager};
//! use std::sync::Arc;
//!
//! let session = Arc::new(SessionManager::new(Arc::new(MemoryStorage::new())));
//! session.rehydrate().await;
//!
//! let client = ApiClient::new(ApiConfig::default(), Arc::clone(&session))?;
//! client.authenticate("a@mymail.pomona.edu", "secret").await?;
//! for m in client.list_matches().await? {
//!     println!("{} ({})", m.display_name, m.score_label());
//! }
//! ```

pub mod client;
pub mod dto;
pub mod error;
pub mod questionnaire;

pub use client::ApiClient;
pub use error::{extract_server_message, ApiError, ApiResult, ValidationError};
pub use questionnaire::{QuestionnaireAnswers, QUESTIONS, QUESTION_COUNT};
