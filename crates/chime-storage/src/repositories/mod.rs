//! Repository implementations.

mod notification_repository;
mod preference_repository;

pub use notification_repository::SqliteNotificationRepository;
pub use preference_repository::SqlitePreferenceRepository;
