//! Retention purge through the engine and the gateway sweeper

use std::sync::Arc;
use std::time::Duration;

use chime_core::{DomainEvent, NotificationRecord};
use chime_gateway::RetentionSweeper;
use pretty_assertions::assert_eq;
use tests::fixtures::{self, ALICE, BOB};
use tests::{events, EngineHarness};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn aged(days: i64) -> NotificationRecord {
    fixtures::aged_record(ALICE, BOB, chrono::Duration::days(days))
}

/// Old read, old unread, old deleted and recent read records
fn seed(h: &EngineHarness) {
    let mut old_read = aged(60);
    old_read.read = true;
    let old_unread = aged(60);
    let mut old_deleted = aged(60);
    old_deleted.deleted_at = Some(chrono::Utc::now());
    let mut recent_read = aged(1);
    recent_read.read = true;

    for record in [old_read, old_unread, old_deleted, recent_read] {
        h.repos.ledger.insert(record);
    }
}

#[tokio::test]
async fn test_purge_of_read_only_keeps_unread_history() {
    let h = EngineHarness::new();
    seed(&h);
    let mut rx = h.subscribe();

    let purged = h.engine.purge_expired(30 * DAY, true).await.unwrap();

    assert_eq!(purged, 2);
    let remaining = h.repos.ledger.all();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().any(|r| !r.read));
    assert!(matches!(
        events::drain(&mut rx).as_slice(),
        [DomainEvent::NotificationsPurged {
            deleted_count: 2,
            ..
        }]
    ));
}

#[tokio::test]
async fn test_full_purge_removes_everything_expired() {
    let h = EngineHarness::new();
    seed(&h);

    let purged = h.engine.purge_expired(30 * DAY, false).await.unwrap();

    assert_eq!(purged, 3);
    assert_eq!(h.repos.ledger.len(), 1);
}

#[tokio::test]
async fn test_nothing_to_purge_emits_nothing() {
    let h = EngineHarness::new();
    h.repos.ledger.insert(aged(1));
    let mut rx = h.subscribe();

    assert_eq!(h.engine.purge_expired(30 * DAY, false).await.unwrap(), 0);
    assert!(events::drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_retention_beyond_calendar_range_purges_nothing() {
    let h = EngineHarness::new();
    seed(&h);

    assert_eq!(h.engine.purge_expired(Duration::MAX, false).await.unwrap(), 0);
    assert_eq!(
        h.engine
            .purge_expired(Duration::from_secs(u64::MAX / 2), true)
            .await
            .unwrap(),
        0
    );
    assert_eq!(h.repos.ledger.len(), 4);
}

#[tokio::test]
async fn test_sweeper_purges_read_notifications_past_retention() {
    let h = EngineHarness::new();
    seed(&h);

    let sweeper = Arc::new(RetentionSweeper::new(h.engine.clone(), 30 * DAY, DAY));
    let purged = sweeper.sweep_once().await.unwrap();

    assert_eq!(purged, 2);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_at_startup_and_on_interval() {
    let h = EngineHarness::new();
    seed(&h);
    let mut rx = h.subscribe();

    let sweeper = Arc::new(RetentionSweeper::new(h.engine.clone(), 30 * DAY, DAY));
    let handle = sweeper.start();

    let first = events::wait_for_event(&mut rx, Duration::from_secs(1), |e| {
        matches!(e, DomainEvent::NotificationsPurged { .. })
    })
    .await;
    assert!(first.is_some(), "Startup sweep should purge");

    let mut old_read = aged(45);
    old_read.read = true;
    h.repos.ledger.insert(old_read);

    let second = events::wait_for_event(&mut rx, 2 * DAY, |e| {
        matches!(e, DomainEvent::NotificationsPurged { deleted_count: 1, .. })
    })
    .await;
    assert!(second.is_some(), "Interval sweep should purge the new record");

    handle.abort();
}
