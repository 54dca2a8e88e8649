//! Event Consumers - lifecycle event handlers
//!
//! Consumers subscribe to `DomainEvent`s from the event bus and react
//! independently of the creation path:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            EventBus (DomainEvent)           │
//! └─────────────────────────────────────────────┘
//!                  │                │
//!                  ▼                ▼
//!          ┌───────────────┐  ┌─────────────┐
//!          │LifecycleLogger│  │DigestBatcher│
//!          │               │  │  (future)   │
//!          └───────────────┘  └─────────────┘
//! ```

mod lifecycle_logger;

pub use lifecycle_logger::{LifecycleLogger, LifecycleStats};
