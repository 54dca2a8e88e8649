//! Chime Gateway
//!
//! Real-time side of the notification engine:
//! - Presence registry mapping users to their live sessions
//! - Fan-out dispatcher pushing notifications and read-state sync
//! - Session command protocol over WebSocket
//! - HTTP routes for notifications and preferences
//! - Lifecycle event consumers and the retention sweeper

pub mod config;
pub mod consumers;
pub mod dispatcher;
pub mod presence;
pub mod protocol;
pub mod retention;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use consumers::{LifecycleLogger, LifecycleStats};
pub use dispatcher::FanoutDispatcher;
pub use presence::{
    ChannelTransport, PresenceEntry, PresenceRegistry, PushError, SessionTransport,
};
pub use protocol::{ClientCommand, PushMessage};
pub use retention::RetentionSweeper;
pub use server::{ApiError, AppState, GatewayDependencies, GatewayServer, USER_ID_HEADER};
pub use session::SessionHub;
