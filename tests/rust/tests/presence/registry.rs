//! Registry behaviour under concurrent connects and disconnects

use std::sync::Arc;

use chime_gateway::PresenceRegistry;
use pretty_assertions::assert_eq;
use tests::fixtures::{ALICE, BOB};
use tests::GatewayHarness;

#[tokio::test]
async fn test_concurrent_sessions_for_many_users() {
    let registry = Arc::new(PresenceRegistry::new());

    let mut handles = Vec::new();
    for user in 0..20 {
        for session in 0..5 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.register(&format!("s-{}-{}", user, session), &format!("u-{}", user));
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.online_count(), 20);
    assert_eq!(registry.session_count(), 100);
    assert_eq!(registry.sessions_for("u-7").len(), 5);

    let mut handles = Vec::new();
    for user in 0..20 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for session in 0..5 {
                registry.unregister(&format!("s-{}-{}", user, session));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.online_count(), 0);
    assert_eq!(registry.session_count(), 0);
}

#[tokio::test]
async fn test_hub_tracks_connect_and_disconnect() {
    let h = GatewayHarness::new();
    let presence = h.presence();

    let _s1 = h.connect("s1", ALICE).await;
    let _s2 = h.connect("s2", ALICE).await;
    let _s3 = h.connect("s3", BOB).await;

    assert!(presence.is_online(ALICE));
    assert_eq!(presence.online_count(), 2);
    assert_eq!(presence.session_count(), 3);

    h.hub().disconnect("s1");
    assert!(presence.is_online(ALICE));
    assert_eq!(presence.sessions_for(ALICE).len(), 1);

    h.hub().disconnect("s2");
    assert!(!presence.is_online(ALICE));
    assert!(presence.user_for("s2").is_none());

    // Unknown session: no-op
    h.hub().disconnect("s2");
    assert_eq!(presence.session_count(), 1);
}

#[tokio::test]
async fn test_reusing_a_session_id_for_another_user_moves_it() {
    let h = GatewayHarness::new();
    let mut events = h.server.event_bus().subscribe();

    let _first = h.connect("shared", ALICE).await;
    let _second = h.connect("shared", BOB).await;

    let presence = h.presence();
    assert!(!presence.is_online(ALICE));
    assert_eq!(presence.user_for("shared").as_deref(), Some(BOB));

    let events = tests::events::drain(&mut events);
    let disconnected_alice = events.iter().any(|e| {
        e.type_name() == "session_disconnected" && e.user_id() == Some(ALICE)
    });
    assert!(disconnected_alice);
}

#[tokio::test]
async fn test_connect_queues_current_unread_count() {
    let h = GatewayHarness::new();
    h.repos.ledger.insert(tests::fixtures::record(ALICE, BOB));
    h.repos.ledger.insert(tests::fixtures::record(ALICE, BOB));

    let mut outbox = h.hub().connect("s1", ALICE).await;

    assert_eq!(
        outbox.try_recv().ok(),
        Some(chime_gateway::PushMessage::UnreadCount { count: 2 })
    );
}
