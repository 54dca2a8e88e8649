//! Fan-out Dispatcher - pushes engine outcomes to every live session of a user
//!
//! Implements `chime_core::NotificationDelivery`, so the engine reaches the
//! presence layer through a trait object and never sees sockets.
//!
//! Every push is best-effort. A session whose outbox is full or closed is
//! logged and skipped; the remaining sessions still receive the message.
//! The unread count that follows each message is read from the ledger once
//! per broadcast, after the session snapshot was taken.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chime_core::{NotificationDelivery, NotificationRecord, NotificationRepository};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::presence::{PresenceRegistry, SessionTransport};
use crate::protocol::PushMessage;

pub struct FanoutDispatcher {
    registry: Arc<PresenceRegistry>,
    transport: Arc<dyn SessionTransport>,
    ledger: Arc<dyn NotificationRepository>,
}

impl FanoutDispatcher {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        transport: Arc<dyn SessionTransport>,
        ledger: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            registry,
            transport,
            ledger,
        }
    }

    /// Push `message` to every session in `sessions`; returns how many accepted it
    fn fan_out(&self, user_id: &str, sessions: &HashSet<String>, message: &PushMessage) -> usize {
        let mut delivered = 0;
        for session_id in sessions {
            match self.transport.push(session_id, message.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    user_id = %user_id,
                    session_id = %session_id,
                    message_type = message.type_name(),
                    error = %e,
                    "[FanoutDispatcher] Push failed"
                ),
            }
        }
        delivered
    }

    /// Follow-up `unread_count` push; skipped if the ledger lookup fails
    async fn push_unread_count(&self, user_id: &str, sessions: &HashSet<String>) {
        match self.ledger.unread_count(user_id).await {
            Ok(count) => {
                self.fan_out(user_id, sessions, &PushMessage::UnreadCount { count });
            }
            Err(e) => warn!(
                user_id = %user_id,
                error = %e,
                "[FanoutDispatcher] Unread count lookup failed, skipping count push"
            ),
        }
    }

    /// Send `message` then a fresh unread count to all of a user's sessions
    async fn broadcast_with_count(&self, user_id: &str, message: PushMessage) -> usize {
        let sessions = self.registry.sessions_for(user_id);
        if sessions.is_empty() {
            debug!(
                user_id = %user_id,
                message_type = message.type_name(),
                "[FanoutDispatcher] User offline, nothing to push"
            );
            return 0;
        }

        let delivered = self.fan_out(user_id, &sessions, &message);
        self.push_unread_count(user_id, &sessions).await;

        debug!(
            user_id = %user_id,
            message_type = message.type_name(),
            sessions = sessions.len(),
            delivered,
            "[FanoutDispatcher] Broadcast complete"
        );
        delivered
    }
}

#[async_trait]
impl NotificationDelivery for FanoutDispatcher {
    async fn deliver_notification(&self, recipient_id: &str, record: &NotificationRecord) -> bool {
        let message = PushMessage::NewNotification {
            record: record.clone(),
        };
        self.broadcast_with_count(recipient_id, message).await > 0
    }

    async fn broadcast_single_read(&self, recipient_id: &str, notification_id: Uuid) {
        self.broadcast_with_count(
            recipient_id,
            PushMessage::NotificationMarkedAsRead {
                id: notification_id,
            },
        )
        .await;
    }

    async fn broadcast_all_read(&self, recipient_id: &str, updated_count: u64) {
        self.broadcast_with_count(recipient_id, PushMessage::MarkAllAsRead { updated_count })
            .await;
    }

    async fn broadcast_deleted(&self, recipient_id: &str, notification_id: Uuid) {
        self.broadcast_with_count(
            recipient_id,
            PushMessage::NotificationDeleted {
                id: notification_id,
            },
        )
        .await;
    }
}
