//! Domain entities, value objects, and events
//!
//! - Notification records and creation requests
//! - Preference profiles and the permission check
//! - Lifecycle events (DomainEvent)

mod event;
mod notification;
mod preference;

pub use event::DomainEvent;
pub use notification::*;
pub use preference::*;
