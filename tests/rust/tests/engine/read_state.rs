//! Read state, listing and deletion

use chime_core::{DomainEvent, EngineError, NotificationRecord};
use pretty_assertions::assert_eq;
use tests::fixtures::{self, ALICE, BOB, CAROL, DAVE};
use tests::mocks::DeliveryCall;
use tests::{events, EngineHarness};

async fn create(h: &EngineHarness, recipient: &str, actor: &str) -> NotificationRecord {
    h.engine
        .create_notification(fixtures::like(recipient, actor))
        .await
        .expect("Create failed")
        .expect("Notification suppressed")
}

#[tokio::test]
async fn test_mark_as_read_is_idempotent() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;
    let mut rx = h.subscribe();

    h.engine.mark_as_read(record.id, ALICE).await.unwrap();
    let after_first = h.repos.ledger.visible_for(ALICE)[0].clone();
    h.engine
        .mark_as_read(record.id, ALICE)
        .await
        .expect("Second mark-read must not fail");
    let after_second = h.repos.ledger.visible_for(ALICE)[0].clone();

    assert!(after_first.read);
    assert!(after_second.read);
    assert_eq!(after_first.read_at, after_second.read_at);

    let events = events::drain(&mut rx);
    assert_eq!(events::count_of(&events, "notification_read"), 1);

    // Sessions are re-synced either way
    let read_calls = h
        .delivery
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DeliveryCall::SingleRead { .. }))
        .count();
    assert_eq!(read_calls, 2);
}

#[tokio::test]
async fn test_mark_as_read_of_foreign_notification_is_forbidden() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;

    let err = h.engine.mark_as_read(record.id, CAROL).await.unwrap_err();

    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(!h.repos.ledger.visible_for(ALICE)[0].read);
}

#[tokio::test]
async fn test_mark_as_read_of_unknown_notification_is_a_noop() {
    let h = EngineHarness::new();
    let mut rx = h.subscribe();

    h.engine
        .mark_as_read(uuid::Uuid::new_v4(), ALICE)
        .await
        .unwrap();

    assert!(events::drain(&mut rx).is_empty());
    assert!(h.delivery.calls().is_empty());
}

#[tokio::test]
async fn test_unread_count_follows_read_state() {
    let h = EngineHarness::new();
    let first = create(&h, ALICE, BOB).await;
    create(&h, ALICE, CAROL).await;
    create(&h, ALICE, DAVE).await;

    assert_eq!(h.engine.get_unread_count(ALICE).await.unwrap(), 3);

    h.engine.mark_as_read(first.id, ALICE).await.unwrap();
    assert_eq!(h.engine.get_unread_count(ALICE).await.unwrap(), 2);

    let updated_count = h.engine.mark_all_as_read(ALICE).await.unwrap();
    assert_eq!(updated_count, 2);
    assert_eq!(h.engine.get_unread_count(ALICE).await.unwrap(), 0);

    assert_eq!(
        h.delivery.calls().last(),
        Some(&DeliveryCall::AllRead {
            recipient_id: ALICE.to_string(),
            updated_count: 2,
        })
    );
}

#[tokio::test]
async fn test_mark_all_with_nothing_unread_still_confirms() {
    let h = EngineHarness::new();
    let mut rx = h.subscribe();

    assert_eq!(h.engine.mark_all_as_read(ALICE).await.unwrap(), 0);

    assert!(matches!(
        events::drain(&mut rx).as_slice(),
        [DomainEvent::AllNotificationsRead {
            updated_count: 0,
            ..
        }]
    ));
    assert_eq!(h.delivery.calls().len(), 1);
}

#[tokio::test]
async fn test_unread_counts_are_per_recipient() {
    let h = EngineHarness::new();
    create(&h, ALICE, BOB).await;
    create(&h, CAROL, BOB).await;

    h.engine.mark_all_as_read(ALICE).await.unwrap();

    assert_eq!(h.engine.get_unread_count(ALICE).await.unwrap(), 0);
    assert_eq!(h.engine.get_unread_count(CAROL).await.unwrap(), 1);
}

#[tokio::test]
async fn test_list_is_newest_first_and_paginated() {
    let h = EngineHarness::new();
    let mut ids = Vec::new();
    for minutes_ago in [30, 20, 10] {
        let record =
            fixtures::aged_record(ALICE, BOB, chrono::Duration::minutes(minutes_ago));
        ids.push(record.id);
        h.repos.ledger.insert(record);
    }
    h.repos.ledger.insert(fixtures::record(CAROL, BOB));

    let first = h.engine.list_notifications(ALICE, 1, 2).await.unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.page, 1);
    assert_eq!(first.limit, 2);
    assert_eq!(
        first.items.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );

    let second = h.engine.list_notifications(ALICE, 2, 2).await.unwrap();
    assert_eq!(
        second.items.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![ids[0]]
    );

    let beyond = h.engine.list_notifications(ALICE, 5, 2).await.unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 3);
}

#[tokio::test]
async fn test_list_clamps_page_and_limit() {
    let h = EngineHarness::new();
    create(&h, ALICE, BOB).await;

    let page = h.engine.list_notifications(ALICE, 0, 0).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.limit, 1);
    assert_eq!(page.items.len(), 1);

    let page = h.engine.list_notifications(ALICE, 1, 10_000).await.unwrap();
    assert_eq!(page.limit, chime_core::MAX_PAGE_LIMIT);
}

#[tokio::test]
async fn test_deleted_notification_disappears() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;
    let mut rx = h.subscribe();

    h.engine.delete_notification(record.id, ALICE).await.unwrap();

    let page = h.engine.list_notifications(ALICE, 1, 20).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(h.engine.get_unread_count(ALICE).await.unwrap(), 0);
    assert_eq!(h.repos.ledger.all().len(), 1, "Deletion is soft");

    assert_eq!(
        events::count_of(&events::drain(&mut rx), "notification_deleted"),
        1
    );
    assert_eq!(
        h.delivery.calls().last(),
        Some(&DeliveryCall::Deleted {
            recipient_id: ALICE.to_string(),
            id: record.id,
        })
    );
}

#[tokio::test]
async fn test_deleting_twice_is_a_noop() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;
    h.engine.delete_notification(record.id, ALICE).await.unwrap();
    let mut rx = h.subscribe();

    h.engine.delete_notification(record.id, ALICE).await.unwrap();

    assert!(events::drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_deleting_foreign_notification_is_forbidden() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;

    let err = h
        .engine
        .delete_notification(record.id, BOB)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Forbidden(_)));
    assert_eq!(h.repos.ledger.visible_for(ALICE).len(), 1);
}

#[tokio::test]
async fn test_mark_read_after_delete_is_a_noop() {
    let h = EngineHarness::new();
    let record = create(&h, ALICE, BOB).await;
    h.engine.delete_notification(record.id, ALICE).await.unwrap();

    h.engine.mark_as_read(record.id, ALICE).await.unwrap();

    assert!(!h.repos.ledger.all()[0].read);
}
