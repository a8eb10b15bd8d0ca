use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use peerhub_services::{Delivery, Hub};

use crate::*;

#[tokio::test]
async fn test_ping_scenario() {
    let (hub, mut peers) = hub_with(&["A"]).await;
    assert_eq!(hub.live_count(), 1);

    let outcome = hub.dispatcher().send_to_peer("A", &json!({"type": "ping"}));
    assert_eq!(outcome, Delivery::Queued);
    assert_eq!(peers[0].drain_json(), vec![json!({"type": "ping"})]);

    hub.registrar().submit_unregister(peers[0].handle.clone());
    hub.registrar().settled().await;
    assert_eq!(hub.live_count(), 0);

    let outcome = hub.dispatcher().send_to_peer("A", &json!({"type": "ping"}));
    assert_eq!(outcome, Delivery::NotConnected);
    assert!(peers[0].is_closed());
}

#[tokio::test]
async fn test_send_to_unknown_peer_returns_promptly() {
    let (hub, _task) = Hub::start();
    let outcome = tokio::time::timeout(Duration::from_secs(1), async {
        hub.dispatcher().send_to_peer("nobody", &json!({"x": 1}))
    })
    .await
    .expect("send must not block");
    assert_eq!(outcome, Delivery::NotConnected);
}

#[tokio::test]
async fn test_stuck_peer_does_not_stall_others() {
    let (hub, mut peers) = hub_with(&["stuck", "live"]).await;

    // Nobody drains "stuck"; once its queue fills, sends fail fast.
    let mut failed = 0;
    for i in 0..(QUEUE * 2) {
        if hub.dispatcher().send_to_peer("stuck", &i) == Delivery::Failed {
            failed += 1;
        }
    }
    assert_eq!(failed, QUEUE);

    assert_eq!(hub.dispatcher().send_to_peer("live", &"hello"), Delivery::Queued);
    assert_eq!(peers[1].drain_json(), vec![json!("hello")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_send_races_unregister_without_panicking() {
    for round in 0..20 {
        let (hub, _task) = Hub::start();
        let hub = Arc::new(hub);
        let (handle, mut rx) = peerhub_services::PeerHandle::new("A", None, 1024);
        hub.registrar().submit_register(handle.clone());
        hub.registrar().settled().await;

        let mut senders = Vec::new();
        for t in 0..4 {
            let hub = hub.clone();
            senders.push(tokio::spawn(async move {
                let mut outcomes = Vec::new();
                for i in 0..200 {
                    outcomes.push(hub.dispatcher().send_to_peer("A", &json!({"t": t, "i": i})));
                    tokio::task::yield_now().await;
                }
                outcomes
            }));
        }

        // Two competing unregisters mid-flight.
        hub.registrar().submit_unregister(handle.clone());
        hub.registrar().submit_unregister(handle.clone());
        hub.registrar().settled().await;

        let mut queued = 0;
        for s in senders {
            for outcome in s.await.expect("sender task panicked") {
                assert!(
                    matches!(
                        outcome,
                        Delivery::Queued | Delivery::NotConnected | Delivery::Aborted
                    ),
                    "round {round}: unexpected outcome {outcome:?}"
                );
                if outcome == Delivery::Queued {
                    queued += 1;
                }
            }
        }

        assert_eq!(hub.live_count(), 0);
        assert!(handle.is_closed());
        assert!(!handle.close_outbound(), "queue must already be closed exactly once");

        // Everything queued before the close is still delivered, then the stream ends.
        let mut drained = 0;
        while rx.recv().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, queued);
    }
}

#[tokio::test]
async fn test_broadcast_reaches_every_peer() {
    let (hub, mut peers) = hub_with(&["a", "b", "c"]).await;

    hub.registrar().submit_unregister(peers[1].handle.clone());
    hub.registrar().settled().await;

    assert_eq!(hub.dispatcher().broadcast(&json!({"type": "tick"})), 2);
    assert_eq!(peers[0].drain_json(), vec![json!({"type": "tick"})]);
    assert!(peers[1].is_closed());
    assert_eq!(peers[2].drain_json(), vec![json!({"type": "tick"})]);
}
