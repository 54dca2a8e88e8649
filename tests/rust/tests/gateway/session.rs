//! Client command protocol over the session hub

use chime_gateway::{ClientCommand, PushMessage};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::fixtures::{self, ALICE, BOB, CAROL};
use tests::{drain_outbox, GatewayHarness};

#[tokio::test]
async fn test_get_unread_count_replies_to_issuer_only() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;
    let mut s2 = h.connect("s2", ALICE).await;
    h.repos.ledger.insert(fixtures::record(ALICE, BOB));

    h.hub()
        .handle_text("s1", r#"{"type":"get_unread_count"}"#)
        .await;

    assert_eq!(
        drain_outbox(&mut s1),
        vec![PushMessage::UnreadCount { count: 1 }]
    );
    assert!(drain_outbox(&mut s2).is_empty());
}

#[tokio::test]
async fn test_list_notifications_returns_a_page() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;
    for actor in [BOB, CAROL] {
        h.engine()
            .create_notification(fixtures::like(ALICE, actor))
            .await
            .unwrap();
    }
    drain_outbox(&mut s1);

    h.hub()
        .handle_command(
            "s1",
            ClientCommand::ListNotifications {
                page: Some(1),
                limit: Some(1),
            },
        )
        .await;

    match drain_outbox(&mut s1).as_slice() {
        [PushMessage::Notifications {
            items,
            total,
            page,
            limit,
        }] => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].actor_id, CAROL, "Newest first");
            assert_eq!((*total, *page, *limit), (2, 1, 1));
        }
        other => panic!("Expected a notifications page, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mark_as_read_frame_is_broadcast_to_all_sessions() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;
    let mut s2 = h.connect("s2", ALICE).await;
    let record = h
        .engine()
        .create_notification(fixtures::like(ALICE, BOB))
        .await
        .unwrap()
        .unwrap();
    drain_outbox(&mut s1);
    drain_outbox(&mut s2);

    let frame = json!({ "type": "mark_as_read", "notificationId": record.id }).to_string();
    h.hub().handle_text("s1", &frame).await;
    // Repeating the command is harmless
    h.hub().handle_text("s1", &frame).await;

    for outbox in [&mut s1, &mut s2] {
        let messages = drain_outbox(outbox);
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0],
            PushMessage::NotificationMarkedAsRead { id: record.id }
        );
        assert_eq!(messages[1], PushMessage::UnreadCount { count: 0 });
    }
    assert_eq!(h.engine().get_unread_count(ALICE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_mark_all_and_delete_frames() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;
    let record = h
        .engine()
        .create_notification(fixtures::like(ALICE, BOB))
        .await
        .unwrap()
        .unwrap();
    drain_outbox(&mut s1);

    h.hub()
        .handle_text("s1", r#"{"type":"mark_all_as_read"}"#)
        .await;
    assert_eq!(
        drain_outbox(&mut s1),
        vec![
            PushMessage::MarkAllAsRead { updated_count: 1 },
            PushMessage::UnreadCount { count: 0 },
        ]
    );

    let frame = json!({ "type": "delete_notification", "notificationId": record.id });
    h.hub().handle_text("s1", &frame.to_string()).await;
    assert_eq!(
        drain_outbox(&mut s1),
        vec![
            PushMessage::NotificationDeleted { id: record.id },
            PushMessage::UnreadCount { count: 0 },
        ]
    );
}

#[tokio::test]
async fn test_malformed_frame_gets_an_error_reply() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;

    for frame in ["not json", r#"{"type":"explode"}"#, r#"{"type":"mark_as_read"}"#] {
        h.hub().handle_text("s1", frame).await;
        match drain_outbox(&mut s1).as_slice() {
            [PushMessage::Error { code, .. }] => assert_eq!(code, "invalid_argument"),
            other => panic!("Expected an error reply for {:?}, got {:?}", frame, other),
        }
    }
}

#[tokio::test]
async fn test_foreign_notification_is_forbidden() {
    let h = GatewayHarness::new();
    let mut bob = h.connect("s-bob", BOB).await;
    let record = h
        .engine()
        .create_notification(fixtures::like(ALICE, BOB))
        .await
        .unwrap()
        .unwrap();

    h.hub()
        .handle_command(
            "s-bob",
            ClientCommand::DeleteNotification {
                notification_id: record.id,
            },
        )
        .await;

    match drain_outbox(&mut bob).as_slice() {
        [PushMessage::Error { code, .. }] => assert_eq!(code, "forbidden"),
        other => panic!("Expected forbidden, got {:?}", other),
    }
    assert_eq!(h.repos.ledger.visible_for(ALICE).len(), 1);
}

#[tokio::test]
async fn test_command_from_unknown_session_is_dropped() {
    let h = GatewayHarness::new();
    let mut s1 = h.connect("s1", ALICE).await;

    h.hub()
        .handle_text("ghost", r#"{"type":"mark_all_as_read"}"#)
        .await;

    assert!(drain_outbox(&mut s1).is_empty());
}
