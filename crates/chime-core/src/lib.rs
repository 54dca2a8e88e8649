//! # Chime Core Library
//!
//! Domain logic for the real-time notification fan-out engine.
//!
//! ## Modules
//!
//! - `domain` - Notification records, preference profiles, lifecycle events
//! - `repository` - Storage and collaborator traits (ledger, preferences, user directory)
//! - `application` - Preference store, dedup guard and the notification engine
//! - `delivery` - Live delivery abstraction implemented by the gateway
//! - `event_bus` - Lifecycle event distribution
//! - `config` - Engine tuning knobs
//! - `error` - Typed engine errors

pub mod application;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod repository;

// Re-export commonly used types
pub use domain::*;
pub use repository::*;

pub use application::{
    CreateOutcome, DedupGuard, EngineBuilder, NotificationEngine, PreferenceAppService,
};
pub use config::EngineConfig;
pub use delivery::{NoopDelivery, NotificationDelivery};
pub use error::{EngineError, EngineResult};
pub use event_bus::{EventBus, EventReceiver, EventSender};
