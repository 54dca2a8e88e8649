//! Domain Events - lifecycle facts published by the engine
//!
//! Emitted on the event bus after the corresponding state change has been
//! committed. Consumers (lifecycle logger, digest batchers, analytics) are
//! optional; publishing never blocks the creation path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::NotificationRecord;

/// Events serialize with a `type` field containing the snake_case variant name:
/// ```json
/// { "type": "notification_created", "record": { ... }, "delivered_realtime": true }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    // ════════════════════════════════════════════════════════════════════════
    // NOTIFICATIONS
    // ════════════════════════════════════════════════════════════════════════
    /// A notification was written to the ledger
    NotificationCreated {
        record: NotificationRecord,
        /// At least one live session received it
        delivered_realtime: bool,
    },

    /// A single notification flipped to read
    NotificationRead {
        user_id: String,
        notification_id: Uuid,
    },

    /// Every unread notification of a user was marked read
    AllNotificationsRead { user_id: String, updated_count: u64 },

    /// A notification was soft-deleted by its recipient
    NotificationDeleted {
        user_id: String,
        notification_id: Uuid,
    },

    /// Retention sweep removed old notifications
    NotificationsPurged {
        deleted_count: u64,
        cutoff: DateTime<Utc>,
    },

    // ════════════════════════════════════════════════════════════════════════
    // PREFERENCES
    // ════════════════════════════════════════════════════════════════════════
    /// A preference profile changed (update, mute toggle, reset)
    PreferencesUpdated { user_id: String },

    // ════════════════════════════════════════════════════════════════════════
    // PRESENCE
    // ════════════════════════════════════════════════════════════════════════
    SessionConnected { user_id: String, session_id: String },

    SessionDisconnected { user_id: String, session_id: String },
}

impl DomainEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NotificationCreated { .. } => "notification_created",
            Self::NotificationRead { .. } => "notification_read",
            Self::AllNotificationsRead { .. } => "all_notifications_read",
            Self::NotificationDeleted { .. } => "notification_deleted",
            Self::NotificationsPurged { .. } => "notifications_purged",
            Self::PreferencesUpdated { .. } => "preferences_updated",
            Self::SessionConnected { .. } => "session_connected",
            Self::SessionDisconnected { .. } => "session_disconnected",
        }
    }

    /// The user this event concerns, if any
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::NotificationCreated { record, .. } => Some(&record.recipient_id),
            Self::NotificationRead { user_id, .. }
            | Self::AllNotificationsRead { user_id, .. }
            | Self::NotificationDeleted { user_id, .. }
            | Self::PreferencesUpdated { user_id }
            | Self::SessionConnected { user_id, .. }
            | Self::SessionDisconnected { user_id, .. } => Some(user_id),
            Self::NotificationsPurged { .. } => None,
        }
    }
}
