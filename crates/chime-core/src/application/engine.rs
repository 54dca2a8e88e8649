//! Notification Engine - the single authoritative creation path
//!
//! `create_notification` runs a fixed decision sequence; the order matters
//! because each step has observable side effects:
//!
//! 1. self-notification  → `Ok(None)`
//! 2. recipient/actor/target validation → `NotFound`
//! 3. preference check   → `Ok(None)` when suppressed (nothing recorded)
//! 4. dedup lookup       → existing record
//! 5. ledger append      (bounded by `write_timeout`)
//! 6. live fan-out       (result logged only)
//! 7. `NotificationCreated` lifecycle event
//!
//! The client-facing read/delete operations also live here so the read-sync
//! broadcasts always follow a committed ledger change.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dedup::lookback;
use super::{DedupGuard, PreferenceAppService};
use crate::config::EngineConfig;
use crate::delivery::NotificationDelivery;
use crate::domain::{
    DomainEvent, MarkReadOutcome, NewNotification, NotificationPage, NotificationRecord,
    NotificationType, PageRequest,
};
use crate::error::{EngineError, EngineResult};
use crate::event_bus::EventSender;
use crate::repository::{NotificationRepository, TargetResolver, UserDirectory};

/// Non-error result of a creation attempt
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// New record written to the ledger
    Created(NotificationRecord),
    /// Identical event inside the dedup window; the earlier record
    Duplicate(NotificationRecord),
    /// Self-notification or blocked by preferences; nothing recorded
    Suppressed,
}

impl CreateOutcome {
    pub fn into_record(self) -> Option<NotificationRecord> {
        match self {
            Self::Created(record) | Self::Duplicate(record) => Some(record),
            Self::Suppressed => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

pub struct NotificationEngine {
    ledger: Arc<dyn NotificationRepository>,
    preferences: Arc<PreferenceAppService>,
    dedup: DedupGuard,
    users: Arc<dyn UserDirectory>,
    targets: Arc<dyn TargetResolver>,
    delivery: Arc<dyn NotificationDelivery>,
    event_sender: EventSender,
    config: EngineConfig,
}

impl NotificationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn NotificationRepository>,
        preferences: Arc<PreferenceAppService>,
        users: Arc<dyn UserDirectory>,
        targets: Arc<dyn TargetResolver>,
        delivery: Arc<dyn NotificationDelivery>,
        event_sender: EventSender,
        config: EngineConfig,
    ) -> Self {
        let dedup = DedupGuard::new(ledger.clone(), config.dedup_window);
        Self {
            ledger,
            preferences,
            dedup,
            users,
            targets,
            delivery,
            event_sender,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn preferences(&self) -> &Arc<PreferenceAppService> {
        &self.preferences
    }

    /// Create, dedup and fan out one notification
    ///
    /// Returns `None` when the event is a self-notification or suppressed by
    /// the recipient's preferences, and the existing record when it falls
    /// inside the dedup window.
    ///
    /// Emits: `NotificationCreated` (new records only)
    pub async fn create_notification(
        &self,
        event: NewNotification,
    ) -> EngineResult<Option<NotificationRecord>> {
        Ok(self.create(event).await?.into_record())
    }

    /// Same as [`create_notification`](Self::create_notification), but tells
    /// the three non-error outcomes apart
    pub async fn create(&self, event: NewNotification) -> EngineResult<CreateOutcome> {
        if event.recipient_id.trim().is_empty() || event.actor_id.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "recipient_id and actor_id are required".to_string(),
            ));
        }

        // 1. Self-notification
        if event.is_self_notification() {
            debug!(
                user_id = %event.recipient_id,
                notification_type = %event.notification_type,
                "[NotificationEngine] Skipping self-notification"
            );
            return Ok(CreateOutcome::Suppressed);
        }

        // 2. Referenced entities
        self.validate_references(&event).await?;

        // 3. Preferences
        let check = self
            .preferences
            .is_allowed(
                &event.recipient_id,
                event.notification_type,
                Some(&event.actor_id),
                event.content(),
            )
            .await;
        if !check.allowed {
            info!(
                recipient_id = %event.recipient_id,
                actor_id = %event.actor_id,
                notification_type = %event.notification_type,
                reason = check.reason.map(|r| r.as_str()).unwrap_or("unknown"),
                "[NotificationEngine] Notification suppressed"
            );
            return Ok(CreateOutcome::Suppressed);
        }

        // 4. Dedup
        match self.dedup.is_duplicate(&event.dedup_key()).await {
            Ok(Some(existing)) => {
                debug!(
                    notification_id = %existing.id,
                    recipient_id = %event.recipient_id,
                    "[NotificationEngine] Duplicate within window, returning existing record"
                );
                return Ok(CreateOutcome::Duplicate(existing));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    recipient_id = %event.recipient_id,
                    error = %e,
                    "[NotificationEngine] Dedup lookup failed, creating anyway"
                );
            }
        }

        // 5. Ledger
        let record = self.append_with_deadline(event.into_record()).await?;

        // 6. Fan-out
        let delivered_realtime = self
            .delivery
            .deliver_notification(&record.recipient_id, &record)
            .await;

        info!(
            notification_id = %record.id,
            recipient_id = %record.recipient_id,
            actor_id = %record.actor_id,
            notification_type = %record.notification_type,
            delivered_realtime,
            "[NotificationEngine] Created notification"
        );

        // 7. Lifecycle event
        self.event_sender.emit(DomainEvent::NotificationCreated {
            record: record.clone(),
            delivered_realtime,
        });

        Ok(CreateOutcome::Created(record))
    }

    /// Create each event independently; returns how many new records were written
    pub async fn create_batch_notifications(&self, events: Vec<NewNotification>) -> usize {
        let total = events.len();
        let mut created = 0;

        for event in events {
            let recipient_id = event.recipient_id.clone();
            let notification_type = event.notification_type;
            match self.create(event).await {
                Ok(CreateOutcome::Created(_)) => created += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        recipient_id = %recipient_id,
                        notification_type = %notification_type,
                        error = %e,
                        "[NotificationEngine] Batch item failed"
                    );
                }
            }
        }

        info!(
            total,
            created, "[NotificationEngine] Batch creation finished"
        );
        created
    }

    /// Mark one notification read; no-op if already read or unknown
    ///
    /// Emits: `NotificationRead` (first transition only)
    pub async fn mark_as_read(&self, notification_id: Uuid, user_id: &str) -> EngineResult<()> {
        let outcome = self.ledger.mark_read(user_id, &notification_id).await?;

        match outcome {
            MarkReadOutcome::Marked => {
                debug!(
                    notification_id = %notification_id,
                    user_id = %user_id,
                    "[NotificationEngine] Marked notification as read"
                );
                self.event_sender.emit(DomainEvent::NotificationRead {
                    user_id: user_id.to_string(),
                    notification_id,
                });
                self.delivery
                    .broadcast_single_read(user_id, notification_id)
                    .await;
            }
            MarkReadOutcome::AlreadyRead => {
                self.delivery
                    .broadcast_single_read(user_id, notification_id)
                    .await;
            }
            MarkReadOutcome::NotFound => {
                debug!(
                    notification_id = %notification_id,
                    user_id = %user_id,
                    "[NotificationEngine] Mark-read for unknown notification ignored"
                );
            }
        }
        Ok(())
    }

    /// Mark every unread notification read
    ///
    /// Emits: `AllNotificationsRead`
    pub async fn mark_all_as_read(&self, user_id: &str) -> EngineResult<u64> {
        let updated_count = self.ledger.mark_all_read(user_id).await?;

        info!(
            user_id = %user_id,
            updated_count,
            "[NotificationEngine] Marked all notifications as read"
        );
        self.event_sender.emit(DomainEvent::AllNotificationsRead {
            user_id: user_id.to_string(),
            updated_count,
        });
        self.delivery.broadcast_all_read(user_id, updated_count).await;

        Ok(updated_count)
    }

    pub async fn get_unread_count(&self, user_id: &str) -> EngineResult<u64> {
        Ok(self.ledger.unread_count(user_id).await?)
    }

    /// Newest-first page of the user's notifications
    pub async fn list_notifications(
        &self,
        user_id: &str,
        page: u32,
        limit: u32,
    ) -> EngineResult<NotificationPage> {
        let request = PageRequest::new(page, limit);
        let (items, total) = self.ledger.list_by_recipient(user_id, request).await?;
        Ok(NotificationPage {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    /// Soft-delete one of the user's notifications
    ///
    /// Emits: `NotificationDeleted`
    pub async fn delete_notification(
        &self,
        notification_id: Uuid,
        user_id: &str,
    ) -> EngineResult<()> {
        if self.ledger.soft_delete(user_id, &notification_id).await? {
            info!(
                notification_id = %notification_id,
                user_id = %user_id,
                "[NotificationEngine] Deleted notification"
            );
            self.event_sender.emit(DomainEvent::NotificationDeleted {
                user_id: user_id.to_string(),
                notification_id,
            });
            self.delivery
                .broadcast_deleted(user_id, notification_id)
                .await;
        }
        Ok(())
    }

    /// Retention sweep over records older than `retention`
    ///
    /// Emits: `NotificationsPurged` (when anything was removed)
    pub async fn purge_expired(&self, retention: Duration, only_read: bool) -> EngineResult<u64> {
        let cutoff = lookback(Utc::now(), retention);

        let deleted_count = self.ledger.purge_older_than(cutoff, only_read).await?;
        if deleted_count > 0 {
            info!(
                deleted_count,
                cutoff = %cutoff,
                only_read,
                "[NotificationEngine] Purged expired notifications"
            );
            self.event_sender.emit(DomainEvent::NotificationsPurged {
                deleted_count,
                cutoff,
            });
        }
        Ok(deleted_count)
    }

    async fn validate_references(&self, event: &NewNotification) -> EngineResult<()> {
        if !self.users.user_exists(&event.recipient_id).await? {
            return Err(EngineError::NotFound(format!(
                "recipient {}",
                event.recipient_id
            )));
        }
        if event.notification_type != NotificationType::System
            && !self.users.user_exists(&event.actor_id).await?
        {
            return Err(EngineError::NotFound(format!("actor {}", event.actor_id)));
        }
        if let Some(target_ref) = &event.target_ref {
            if !self.targets.exists(target_ref).await? {
                return Err(EngineError::NotFound(format!("target {}", target_ref)));
            }
        }
        Ok(())
    }

    async fn append_with_deadline(
        &self,
        record: NotificationRecord,
    ) -> EngineResult<NotificationRecord> {
        let deadline = self.config.write_timeout;
        match tokio::time::timeout(deadline, self.ledger.append(&record)).await {
            Ok(Ok(stored)) => Ok(stored),
            Ok(Err(e)) => {
                warn!(
                    recipient_id = %record.recipient_id,
                    error = %e,
                    "[NotificationEngine] Ledger write failed"
                );
                Err(EngineError::Storage(e))
            }
            Err(_) => {
                warn!(
                    recipient_id = %record.recipient_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "[NotificationEngine] Ledger write timed out"
                );
                Err(EngineError::Timeout(deadline))
            }
        }
    }
}
