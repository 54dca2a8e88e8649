//! Dedup Guard
//!
//! Looks back over the ledger for a near-identical notification. This is a
//! read-then-decide check, not a constraint: two creations racing on the same
//! key can both land. Duplicates are cosmetic, so that is acceptable.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{DedupKey, NotificationRecord};
use crate::repository::{NotificationRepository, RepoResult};

pub struct DedupGuard {
    ledger: Arc<dyn NotificationRepository>,
    window: Duration,
}

impl DedupGuard {
    pub fn new(ledger: Arc<dyn NotificationRepository>, window: Duration) -> Self {
        Self { ledger, window }
    }

    /// Existing non-deleted record for `key` created inside the window
    pub async fn is_duplicate(&self, key: &DedupKey) -> RepoResult<Option<NotificationRecord>> {
        let since = lookback(Utc::now(), self.window);
        self.ledger.find_recent(key, since).await
    }
}

/// `now - span`, saturating at the earliest representable instant
pub(crate) fn lookback(now: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(span)
        .ok()
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
