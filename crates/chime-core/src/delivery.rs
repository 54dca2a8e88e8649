//! Live delivery abstraction
//!
//! The engine depends on this trait rather than on the gateway's concrete
//! dispatcher, so the core crate stays free of presence and transport
//! concerns.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::NotificationRecord;

/// Pushes engine outcomes to a recipient's live sessions
///
/// Every method is best-effort: implementations log failures and never
/// return them, since the ledger state is already committed.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    /// Push `new_notification` followed by `unread_count` to every session of
    /// `recipient_id`. Returns true if at least one session received it.
    async fn deliver_notification(&self, recipient_id: &str, record: &NotificationRecord) -> bool;

    /// Sync other sessions after a single mark-read
    async fn broadcast_single_read(&self, recipient_id: &str, notification_id: Uuid);

    /// Sync other sessions after mark-all-read
    async fn broadcast_all_read(&self, recipient_id: &str, updated_count: u64);

    /// Sync other sessions after a delete
    async fn broadcast_deleted(&self, recipient_id: &str, notification_id: Uuid);
}

/// Delivery that reaches nobody; for headless jobs such as bulk imports
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelivery;

#[async_trait]
impl NotificationDelivery for NoopDelivery {
    async fn deliver_notification(&self, _recipient_id: &str, _record: &NotificationRecord) -> bool {
        false
    }

    async fn broadcast_single_read(&self, _recipient_id: &str, _notification_id: Uuid) {}

    async fn broadcast_all_read(&self, _recipient_id: &str, _updated_count: u64) {}

    async fn broadcast_deleted(&self, _recipient_id: &str, _notification_id: Uuid) {}
}
