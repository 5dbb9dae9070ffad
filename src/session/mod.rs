//! Session state
//!
//! The authenticated identity of the running client, its persistence, and
//! the unverified decoding of the access token's claims.

pub mod error;
pub mod manager;
pub mod storage;
pub mod token;

pub use error::{SessionError, SessionResult};
pub use manager::{Session, SessionManager, SessionState};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, ACCESS_TOKEN_KEY, USER_ID_KEY};
pub use token::{decode_claims, TokenClaims, TokenError};
