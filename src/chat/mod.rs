//! Chat transport
//!
//! Per-conversation WebSocket channels and the event log views build from
//! them.
//!
//! # Example
//!
//! ```rust,ignore
//! use roommatch::chat::{ChatChannel, ChatHistory, ConversationId, ReconnectPolicy};
//!
//! let conversation = ConversationId::new("1", "2");
//! let url = client.chat_socket_url(&conversation)?;
//! let mut channel = ChatChannel::open(url, conversation, ReconnectPolicy::default());
//! let mut history = ChatHistory::new();
//!
//! channel.send("hey")?;
//! while let Some(event) = channel.next_event().await {
//!     history.apply(&event);
//! }
//! ```

pub mod channel;
pub mod events;
pub mod history;

pub use channel::{
    socket_url, ws_origin, ChannelState, ChatChannel, ChatError, ReconnectPolicy,
};
pub use events::{ChatEvent, CloseReason, ConversationId, MessageOrigin};
pub use history::{ChatHistory, HistoryEntry};
