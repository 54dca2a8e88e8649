//! Session transport - the write half of a live connection
//!
//! The dispatcher never touches sockets. It hands a `PushMessage` to a
//! `SessionTransport`, which for the bundled implementation means a
//! non-blocking `try_send` into the session's bounded outbox. The socket
//! task on the other end drains the outbox and writes frames.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::PushMessage;

/// Default per-session outbox capacity
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;

/// Why a push did not reach its session
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PushError {
    #[error("session {0} has no open outbox")]
    UnknownSession(String),

    #[error("outbox for session {0} is full")]
    Full(String),

    #[error("outbox for session {0} is closed")]
    Closed(String),
}

/// Delivers messages to individual sessions
pub trait SessionTransport: Send + Sync {
    /// Must not block; a slow session fails its own push only
    fn push(&self, session_id: &str, message: PushMessage) -> Result<(), PushError>;
}

/// `SessionTransport` backed by one bounded mpsc channel per session
pub struct ChannelTransport {
    outboxes: DashMap<String, mpsc::Sender<PushMessage>>,
    capacity: usize,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            outboxes: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Open (or replace) the outbox for a session and return its receiver
    pub fn open(&self, session_id: &str) -> mpsc::Receiver<PushMessage> {
        let (tx, rx) = mpsc::channel(self.capacity);
        if self.outboxes.insert(session_id.to_string(), tx).is_some() {
            debug!(session_id = %session_id, "[ChannelTransport] Replaced existing outbox");
        }
        rx
    }

    pub fn close(&self, session_id: &str) -> bool {
        self.outboxes.remove(session_id).is_some()
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}

impl SessionTransport for ChannelTransport {
    fn push(&self, session_id: &str, message: PushMessage) -> Result<(), PushError> {
        // Clone the sender so the shard lock is released before sending
        let sender = self
            .outboxes
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PushError::UnknownSession(session_id.to_string()))?;

        sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full(session_id.to_string()),
            mpsc::error::TrySendError::Closed(_) => PushError::Closed(session_id.to_string()),
        })
    }
}
