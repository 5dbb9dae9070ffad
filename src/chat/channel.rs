//! Chat Channel
//!
//! One WebSocket per conversation. A background worker owns the socket;
//! the [`ChatChannel`] handle queues outgoing text and hands out events.
//!
//! Frames are raw text in both directions. Delivery is at-most-once: a send
//! is reported as [`ChatEvent::Sent`] as soon as it is queued, and a frame
//! written to a socket that then fails is lost.

use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::events::{ChatEvent, CloseReason, ConversationId};
use crate::api::dto::ChatMessage;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Chat transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Chat channel is closed")]
    Closed,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Invalid chat URL: {0}")]
    InvalidUrl(String),
}

/// Lifecycle of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Reconnection with exponential backoff
///
/// `max_attempts = 0` disables reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Delay before reconnect attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

/// WebSocket origin for an HTTP origin (`http` to `ws`, `https` to `wss`)
pub fn ws_origin(base_url: &str) -> Result<String, ChatError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        Ok(format!("wss://{}", rest))
    } else if let Some(rest) = base.strip_prefix("http://") {
        Ok(format!("ws://{}", rest))
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        Ok(base.to_string())
    } else {
        Err(ChatError::InvalidUrl(base_url.to_string()))
    }
}

/// Full socket URL for a conversation
pub fn socket_url(ws_origin: &str, conversation: &ConversationId) -> String {
    format!("{}{}", ws_origin.trim_end_matches('/'), conversation.path())
}

/// Handle to a live conversation
pub struct ChatChannel {
    conversation: ConversationId,
    outbound: mpsc::UnboundedSender<String>,
    event_tx: mpsc::UnboundedSender<ChatEvent>,
    events: mpsc::UnboundedReceiver<ChatEvent>,
    state: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
    /// Held while queuing a send and while the worker shuts down, so a send
    /// is either reported before `Closed` or refused
    gate: Arc<Mutex<()>>,
    finished: bool,
}

impl ChatChannel {
    /// Start dialing `url`; must be called inside a tokio runtime
    pub fn open(url: impl Into<String>, conversation: ConversationId, policy: ReconnectPolicy) -> Self {
        let url = url.into();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ChannelState::Connecting);
        let cancel = CancellationToken::new();
        let gate = Arc::new(Mutex::new(()));

        tracing::debug!(url = %url, peer_id = %conversation.peer_id, "Opening chat channel");

        let worker = Worker {
            url,
            peer_id: conversation.peer_id.clone(),
            policy,
            outbound: outbound_rx,
            events: event_tx.clone(),
            state: state_tx,
            cancel: cancel.clone(),
            gate: Arc::clone(&gate),
        };
        tokio::spawn(worker.run());

        Self {
            conversation,
            outbound,
            event_tx,
            events,
            state,
            cancel,
            gate,
            finished: false,
        }
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Queue a message; sends made while connecting go out once the socket opens
    pub fn send(&self, content: &str) -> Result<ChatMessage, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _gate = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.cancel.is_cancelled() || self.state() == ChannelState::Closed {
            return Err(ChatError::Closed);
        }

        self.outbound
            .send(content.to_string())
            .map_err(|_| ChatError::Closed)?;

        let message = ChatMessage {
            sender: self.conversation.user_id.clone(),
            content: content.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let _ = self.event_tx.send(ChatEvent::Sent(message.clone()));
        Ok(message)
    }

    /// Next event; `None` once `Closed` has been delivered
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await?;
        self.finished = event.is_closed();
        Some(event)
    }

    /// Next event if one is already queued
    pub fn try_next_event(&mut self) -> Option<ChatEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.try_recv().ok()?;
        self.finished = event.is_closed();
        Some(event)
    }

    /// Close the socket; a `Closed` event follows
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Wait until the worker has released the socket
    pub async fn closed(&mut self) {
        let _ = self
            .state
            .wait_for(|state| *state == ChannelState::Closed)
            .await;
    }
}

impl Drop for ChatChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ChatChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatChannel")
            .field("conversation", &self.conversation)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

enum PumpExit {
    Local,
    Lost(CloseReason),
}

struct Worker {
    url: String,
    peer_id: String,
    policy: ReconnectPolicy,
    outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ChatEvent>,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
    gate: Arc<Mutex<()>>,
}

impl Worker {
    async fn run(mut self) {
        let mut attempt = 0u32;

        let reason = loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break CloseReason::Local,
                result = connect_async(self.url.as_str()) => result,
            };

            let lost = match connected {
                Ok((socket, _)) => {
                    attempt = 0;
                    self.state.send_replace(ChannelState::Open);
                    tracing::info!(peer_id = %self.peer_id, "Chat channel open");
                    self.emit(ChatEvent::Opened);

                    match self.pump(socket).await {
                        PumpExit::Local => break CloseReason::Local,
                        PumpExit::Lost(reason) => reason,
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Chat connect failed");
                    CloseReason::ConnectFailed(e.to_string())
                }
            };

            if attempt >= self.policy.max_attempts {
                break lost;
            }

            let delay = self.policy.delay_for(attempt);
            attempt += 1;
            self.state.send_replace(ChannelState::Connecting);
            tracing::info!(peer_id = %self.peer_id, attempt, delay_ms = delay.as_millis() as u64, "Reconnecting chat");
            self.emit(ChatEvent::Reconnecting { attempt, delay });

            tokio::select! {
                _ = self.cancel.cancelled() => break CloseReason::Local,
                _ = tokio::time::sleep(delay) => {}
            }
        };

        tracing::info!(peer_id = %self.peer_id, reason = ?reason, "Chat channel closed");
        let _gate = self.gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.outbound.close();
        self.state.send_replace(ChannelState::Closed);
        self.emit(ChatEvent::Closed { reason });
    }

    async fn pump(&mut self, socket: Socket) -> PumpExit {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::Local;
                }
                outgoing = self.outbound.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            tracing::debug!(peer_id = %self.peer_id, error = %e, "Chat send failed");
                            return PumpExit::Lost(CloseReason::Error(e.to_string()));
                        }
                    }
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return PumpExit::Local;
                    }
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.emit(ChatEvent::Received(ChatMessage {
                            sender: self.peer_id.clone(),
                            content: text,
                            timestamp: chrono::Utc::now().to_rfc3339(),
                        }));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        return PumpExit::Lost(CloseReason::Remote(reason));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(peer_id = %self.peer_id, error = %e, "Chat receive failed");
                        return PumpExit::Lost(CloseReason::Error(e.to_string()));
                    }
                    None => return PumpExit::Lost(CloseReason::Remote(None)),
                },
            }
        }
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }
}
