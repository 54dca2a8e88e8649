//! Repository and collaborator traits
//!
//! These traits define the interface for data storage and for the external
//! subsystems the engine consults, without specifying the implementation
//! (SQLite, in-memory, remote service, etc.)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    DedupKey, MarkReadOutcome, NotificationRecord, PageRequest, PreferenceProfile,
};

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// In-place profile edit; returns true when it changed anything
pub type ProfileEdit = Box<dyn FnOnce(&mut PreferenceProfile) -> bool + Send>;

/// A recipient tried to touch a notification that belongs to someone else
///
/// Returned (inside `anyhow::Error`) by ledger implementations so the engine
/// can map it to `EngineError::Forbidden`.
#[derive(Debug, thiserror::Error)]
#[error("notification {notification_id} belongs to a different recipient")]
pub struct OwnershipViolation {
    pub notification_id: Uuid,
}

/// Notification ledger
///
/// Soft-deleted records are invisible to every method.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a new record
    async fn append(&self, record: &NotificationRecord) -> RepoResult<NotificationRecord>;

    /// Get a record by ID
    async fn get(&self, id: &Uuid) -> RepoResult<Option<NotificationRecord>>;

    /// Most recent record matching `key` created at or after `since`
    async fn find_recent(
        &self,
        key: &DedupKey,
        since: DateTime<Utc>,
    ) -> RepoResult<Option<NotificationRecord>>;

    /// Page of a recipient's records (newest first) plus the total count
    async fn list_by_recipient(
        &self,
        recipient_id: &str,
        page: PageRequest,
    ) -> RepoResult<(Vec<NotificationRecord>, u64)>;

    /// Flip one record to read; `OwnershipViolation` if it is not the recipient's
    async fn mark_read(&self, recipient_id: &str, id: &Uuid) -> RepoResult<MarkReadOutcome>;

    /// Mark every unread record read; returns how many changed
    async fn mark_all_read(&self, recipient_id: &str) -> RepoResult<u64>;

    /// Number of unread records
    async fn unread_count(&self, recipient_id: &str) -> RepoResult<u64>;

    /// Soft delete; `OwnershipViolation` if it is not the recipient's.
    /// Returns false when there was nothing to delete.
    async fn soft_delete(&self, recipient_id: &str, id: &Uuid) -> RepoResult<bool>;

    /// Retention sweep: remove records created before `cutoff`
    async fn purge_older_than(&self, cutoff: DateTime<Utc>, only_read: bool) -> RepoResult<u64>;
}

/// Preference profile storage
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Get a profile by user ID
    async fn get(&self, user_id: &str) -> RepoResult<Option<PreferenceProfile>>;

    /// Insert `profile` unless one exists; returns the stored profile
    async fn get_or_insert(&self, profile: &PreferenceProfile) -> RepoResult<PreferenceProfile>;

    /// Atomic read-modify-write of one user's profile
    ///
    /// Loads the stored profile (or a default one), applies `edit`, and
    /// persists the result if `edit` reports a change. No other mutation of
    /// the same profile may interleave. Returns the profile as stored and
    /// whether it changed.
    async fn modify(
        &self,
        user_id: &str,
        edit: ProfileEdit,
    ) -> RepoResult<(PreferenceProfile, bool)>;

    /// Delete a profile
    async fn delete(&self, user_id: &str) -> RepoResult<()>;
}

/// External user directory
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: &str) -> RepoResult<bool>;

    /// Resolve handles to user IDs; unknown handles are absent from the map
    async fn resolve_handles(&self, handles: &[String]) -> RepoResult<HashMap<String, String>>;
}

/// External content lookup for notification targets (posts, replies, reposts)
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn exists(&self, target_ref: &str) -> RepoResult<bool>;
}

/// Directory that accepts every non-empty user id and resolves no handles
///
/// For deployments where the calling subsystem has already validated users.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveUserDirectory;

#[async_trait]
impl UserDirectory for PermissiveUserDirectory {
    async fn user_exists(&self, user_id: &str) -> RepoResult<bool> {
        Ok(!user_id.trim().is_empty())
    }

    async fn resolve_handles(&self, _handles: &[String]) -> RepoResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}

/// Resolver that treats every target as existing
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveTargetResolver;

#[async_trait]
impl TargetResolver for PermissiveTargetResolver {
    async fn exists(&self, target_ref: &str) -> RepoResult<bool> {
        Ok(!target_ref.trim().is_empty())
    }
}
