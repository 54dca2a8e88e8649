//! Lifecycle Logger - structured log line per lifecycle event
//!
//! Keeps running totals so operators (and `/health`) can see how many
//! notifications were created and how many reached a live session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chime_core::{DomainEvent, EventReceiver};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Snapshot of the logger's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStats {
    pub created: u64,
    pub delivered_realtime: u64,
    pub read: u64,
    pub deleted: u64,
    pub purged: u64,
}

#[derive(Default)]
pub struct LifecycleLogger {
    created: AtomicU64,
    delivered_realtime: AtomicU64,
    read: AtomicU64,
    deleted: AtomicU64,
    purged: AtomicU64,
}

impl LifecycleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume events until the bus closes
    pub fn start(self: Arc<Self>, mut events: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("[LifecycleLogger] Started listening for lifecycle events");
            while let Some(event) = events.recv().await {
                self.handle_event(&event);
            }
            info!("[LifecycleLogger] Event bus closed, stopping");
        })
    }

    pub fn handle_event(&self, event: &DomainEvent) {
        match event {
            DomainEvent::NotificationCreated {
                record,
                delivered_realtime,
            } => {
                self.created.fetch_add(1, Ordering::Relaxed);
                if *delivered_realtime {
                    self.delivered_realtime.fetch_add(1, Ordering::Relaxed);
                }
                info!(
                    notification_id = %record.id,
                    notification_type = %record.notification_type,
                    recipient_id = %record.recipient_id,
                    actor_id = %record.actor_id,
                    delivered_realtime,
                    "[LifecycleLogger] Notification created"
                );
            }
            DomainEvent::NotificationRead { .. } => {
                self.read.fetch_add(1, Ordering::Relaxed);
            }
            DomainEvent::AllNotificationsRead { updated_count, .. } => {
                self.read.fetch_add(*updated_count, Ordering::Relaxed);
            }
            DomainEvent::NotificationDeleted { .. } => {
                self.deleted.fetch_add(1, Ordering::Relaxed);
            }
            DomainEvent::NotificationsPurged {
                deleted_count,
                cutoff,
            } => {
                self.purged.fetch_add(*deleted_count, Ordering::Relaxed);
                info!(
                    deleted_count,
                    cutoff = %cutoff,
                    "[LifecycleLogger] Retention sweep purged notifications"
                );
            }
            _ => {}
        }

        debug!(
            event_type = event.type_name(),
            user_id = event.user_id().unwrap_or("-"),
            "[LifecycleLogger] Event observed"
        );
    }

    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            created: self.created.load(Ordering::Relaxed),
            delivered_realtime: self.delivered_realtime.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
        }
    }
}
