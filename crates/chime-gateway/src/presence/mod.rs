//! Presence: the registry of live sessions and the transport that reaches them

mod registry;
mod transport;

pub use registry::{PresenceEntry, PresenceRegistry};
pub use transport::{ChannelTransport, PushError, SessionTransport, DEFAULT_OUTBOX_CAPACITY};
