//! Notification records and the events that create them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque key-value bag carried on a notification
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the content snippet used for keyword muting
pub const CONTENT_KEY: &str = "content";

/// Default page size for recipient listings
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound on page size for recipient listings
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Kind of event a notification describes
///
/// Closed set: adding a variant forces every exhaustive table
/// (preference toggles, storage mapping) to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Like,
    Reply,
    Repost,
    Follow,
    Mention,
    System,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        Self::Like,
        Self::Reply,
        Self::Repost,
        Self::Follow,
        Self::Mention,
        Self::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Reply => "reply",
            Self::Repost => "repost",
            Self::Follow => "follow",
            Self::Mention => "mention",
            Self::System => "system",
        }
    }

    /// Parse the stored string form
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// System notifications may target their own actor
    pub fn allows_self_notification(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key identifying near-identical notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub notification_type: NotificationType,
    pub actor_id: String,
    pub recipient_id: String,
    pub target_ref: Option<String>,
}

/// Request to create a notification, as sent by the originating subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient_id: String,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewNotification {
    pub fn new(
        notification_type: NotificationType,
        recipient_id: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        Self {
            notification_type,
            recipient_id: recipient_id.into(),
            actor_id: actor_id.into(),
            target_ref: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_target(mut self, target_ref: impl Into<String>) -> Self {
        self.target_ref = Some(target_ref.into());
        self
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.with_metadata(CONTENT_KEY, Value::String(content.into()))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Recipient and actor are the same user on a non-system event
    pub fn is_self_notification(&self) -> bool {
        self.recipient_id == self.actor_id && !self.notification_type.allows_self_notification()
    }

    /// Content snippet used for keyword matching
    pub fn content(&self) -> Option<&str> {
        self.metadata.get(CONTENT_KEY).and_then(Value::as_str)
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            notification_type: self.notification_type,
            actor_id: self.actor_id.clone(),
            recipient_id: self.recipient_id.clone(),
            target_ref: self.target_ref.clone(),
        }
    }

    /// Materialize a fresh, unread record for this event
    pub fn into_record(self) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            notification_type: self.notification_type,
            recipient_id: self.recipient_id,
            actor_id: self.actor_id,
            target_ref: self.target_ref,
            read: false,
            read_at: None,
            created_at: Utc::now(),
            deleted_at: None,
            metadata: self.metadata,
        }
    }
}

/// A persisted notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient_id: String,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<String>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; deleted records are invisible to queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NotificationRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn content(&self) -> Option<&str> {
        self.metadata.get(CONTENT_KEY).and_then(Value::as_str)
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            notification_type: self.notification_type,
            actor_id: self.actor_id.clone(),
            recipient_id: self.recipient_id.clone(),
            target_ref: self.target_ref.clone(),
        }
    }

    /// Does this record fall under `key`?
    pub fn matches(&self, key: &DedupKey) -> bool {
        self.notification_type == key.notification_type
            && self.actor_id == key.actor_id
            && self.recipient_id == key.recipient_id
            && self.target_ref == key.target_ref
    }
}

/// Offset pagination request (1-based page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamp page to >= 1 and limit to `1..=MAX_PAGE_LIMIT`
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

/// One page of a recipient's notifications, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<NotificationRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Result of a single mark-read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    /// Flipped from unread to read
    Marked,
    /// Already read; nothing changed
    AlreadyRead,
    /// No visible notification with that id
    NotFound,
}
