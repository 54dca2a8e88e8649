//! Event Bus - lifecycle event distribution
//!
//! The engine publishes a `DomainEvent` after every committed state change.
//! Zero or more consumers (lifecycle logger, digest batcher, analytics)
//! subscribe independently.
//!
//! ```text
//! NotificationEngine ──┐                 ┌─▶ LifecycleLogger
//! PreferenceAppService ├─▶ broadcast ────┼─▶ DigestBatcher (future)
//! SessionHub ──────────┘                 └─▶ ...
//! ```
//!
//! Publishing is a non-blocking `broadcast::Sender::send`: with no
//! subscribers the event is dropped, and slow subscribers lag instead of
//! applying backpressure to the creation path.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::DomainEvent;

/// Default channel capacity for the event bus
pub const DEFAULT_CAPACITY: usize = 1024;

/// Lifecycle event hub backed by a broadcast channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is bumped to one
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Producer handle; cheap to clone
    pub fn sender(&self) -> EventSender {
        EventSender(self.tx.clone())
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver(self.tx.subscribe())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of the bus
#[derive(Clone)]
pub struct EventSender(broadcast::Sender<DomainEvent>);

impl EventSender {
    /// Publish an event; returns how many subscribers will see it
    pub fn emit(&self, event: DomainEvent) -> usize {
        let event_type = event.type_name();
        // `send` only fails when nobody is listening
        let receivers = self.0.send(event).unwrap_or(0);
        debug!(event_type, receivers, "[EventBus] Published");
        receivers
    }

    pub fn has_subscribers(&self) -> bool {
        self.0.receiver_count() > 0
    }
}

/// Consumer side of the bus
pub struct EventReceiver(broadcast::Receiver<DomainEvent>);

impl EventReceiver {
    /// Next event, skipping over lag; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.0.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => log_lag(skipped),
                Err(RecvError::Closed) => {
                    debug!("[EventBus] All senders dropped");
                    return None;
                }
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.0.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => log_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

fn log_lag(skipped: u64) {
    warn!(skipped, "[EventBus] Consumer fell behind, oldest events dropped");
}
