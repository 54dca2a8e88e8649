//! Session wire protocol
//!
//! Both directions are JSON objects tagged by a snake_case `type` field:
//!
//! ```json
//! { "type": "new_notification", "record": { "id": "...", "type": "like", ... } }
//! { "type": "unread_count", "count": 3 }
//! { "type": "mark_as_read", "notificationId": "..." }
//! ```

use chime_core::{NotificationPage, NotificationRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server → session messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    NewNotification {
        record: NotificationRecord,
    },
    UnreadCount {
        count: u64,
    },
    NotificationMarkedAsRead {
        id: Uuid,
    },
    MarkAllAsRead {
        #[serde(rename = "updatedCount")]
        updated_count: u64,
    },
    NotificationDeleted {
        id: Uuid,
    },
    /// Reply to `list_notifications`
    Notifications {
        items: Vec<NotificationRecord>,
        total: u64,
        page: u32,
        limit: u32,
    },
    /// Reply to a command that failed
    Error {
        code: String,
        message: String,
    },
}

impl PushMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NewNotification { .. } => "new_notification",
            Self::UnreadCount { .. } => "unread_count",
            Self::NotificationMarkedAsRead { .. } => "notification_marked_as_read",
            Self::MarkAllAsRead { .. } => "mark_all_as_read",
            Self::NotificationDeleted { .. } => "notification_deleted",
            Self::Notifications { .. } => "notifications",
            Self::Error { .. } => "error",
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<NotificationPage> for PushMessage {
    fn from(page: NotificationPage) -> Self {
        Self::Notifications {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Session → server commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    MarkAsRead {
        #[serde(rename = "notificationId")]
        notification_id: Uuid,
    },
    MarkAllAsRead,
    GetUnreadCount,
    ListNotifications {
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        limit: Option<u32>,
    },
    DeleteNotification {
        #[serde(rename = "notificationId")]
        notification_id: Uuid,
    },
}
