//! Chime Storage Layer
//!
//! SQLite persistence for the notification ledger and preference profiles.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 NotificationEngine                   │
//! ├──────────────────────────────────────────────────────┤
//! │                  Repository Traits                   │
//! │     (NotificationRepository, PreferenceRepository)   │
//! ├──────────────────────────────────────────────────────┤
//! │               SQLite Implementations                 │
//! │ (SqliteNotificationRepository, SqlitePreferenceRepo) │
//! ├──────────────────────────────────────────────────────┤
//! │                 Database (SQLite)                    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use chime_storage::{Database, SqliteNotificationRepository, SqlitePreferenceRepository};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let ledger = SqliteNotificationRepository::new(db.clone());
//! let preferences = SqlitePreferenceRepository::new(db);
//! ```

mod database;
mod repositories;
mod time;

pub use database::Database;
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "chime.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("chime").join(DATABASE_FILE))
}
