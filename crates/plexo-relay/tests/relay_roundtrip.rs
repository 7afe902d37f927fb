// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end: two collaboration clients exchanging events through the relay.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use plexo_collab::{event_types, CollabEvent, CollaborationService, ConnectionStatus};
use plexo_config::model::{CollabConfig, ConflictPolicy};
use plexo_relay::{serve, RelayState};
use serde_json::json;
use tokio::net::TcpListener;

async fn start_relay() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = serve(listener, RelayState::new()).await;
    });
    addr
}

fn client(addr: std::net::SocketAddr) -> CollaborationService {
    CollaborationService::new(CollabConfig {
        enabled: true,
        server_url: format!("ws://{addr}"),
        heartbeat_interval_secs: 30,
        reconnect_base_delay_ms: 50,
        max_reconnect_attempts: 3,
        conflict_policy: ConflictPolicy::LastWriteWins,
    })
}

fn collect(
    service: &CollaborationService,
    event_type: &str,
) -> Arc<Mutex<Vec<CollabEvent>>> {
    let seen: Arc<Mutex<Vec<CollabEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service.on(event_type, move |event| {
        sink.lock().unwrap().push(event.clone());
    });
    seen
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..100 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test(flavor = "multi_thread")]
async fn events_reach_other_participants_but_not_the_sender() {
    let addr = start_relay().await;

    let alice = client(addr);
    let bob = client(addr);

    let alice_cursors = collect(&alice, event_types::CURSOR);
    let bob_cursors = collect(&bob, event_types::CURSOR);
    let bob_joins = collect(&bob, event_types::JOIN);

    bob.connect("page-1", "bob").await.unwrap();
    wait_until(|| bob.status() == ConnectionStatus::Connected).await;

    alice.connect("page-1", "alice").await.unwrap();
    wait_until(|| alice.status() == ConnectionStatus::Connected).await;

    // Bob sees alice join.
    wait_until(|| !bob_joins.lock().unwrap().is_empty()).await;
    assert_eq!(bob_joins.lock().unwrap()[0].user_id, "alice");

    alice.broadcast_cursor_move(12.0, 34.0);
    wait_until(|| !bob_cursors.lock().unwrap().is_empty()).await;

    {
        let seen = bob_cursors.lock().unwrap();
        assert_eq!(seen[0].user_id, "alice");
        assert_eq!(seen[0].data["x"], 12.0);
    }
    // Never echoed back to the sender.
    assert!(alice_cursors.lock().unwrap().is_empty());

    // Bob's presence state now tracks alice's cursor.
    assert_eq!(bob.collaboration_state().cursors.len(), 1);

    alice.disconnect();
    bob.disconnect();
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnect_removes_collaborator_from_peers() {
    let addr = start_relay().await;

    let alice = client(addr);
    let bob = client(addr);
    let bob_leaves = collect(&bob, event_types::LEAVE);

    bob.connect("page-2", "bob").await.unwrap();
    wait_until(|| bob.status() == ConnectionStatus::Connected).await;
    alice.connect("page-2", "alice").await.unwrap();
    wait_until(|| alice.status() == ConnectionStatus::Connected).await;

    alice.broadcast_cursor_move(1.0, 1.0);
    wait_until(|| !bob.collaboration_state().cursors.is_empty()).await;

    alice.disconnect();
    wait_until(|| !bob_leaves.lock().unwrap().is_empty()).await;

    let state = bob.collaboration_state();
    assert!(state.collaborators.iter().all(|c| c.user_id != "alice"));
    assert!(state.cursors.is_empty());

    bob.disconnect();
}

#[tokio::test(flavor = "multi_thread")]
async fn sessions_are_isolated() {
    let addr = start_relay().await;

    let alice = client(addr);
    let carol = client(addr);
    let carol_cursors = collect(&carol, event_types::CURSOR);

    alice.connect("page-a", "alice").await.unwrap();
    carol.connect("page-b", "carol").await.unwrap();
    wait_until(|| {
        alice.status() == ConnectionStatus::Connected
            && carol.status() == ConnectionStatus::Connected
    })
    .await;

    alice.broadcast_cursor_move(5.0, 5.0);
    alice.broadcast_layout_change(json!({"cols": 12}));
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(carol_cursors.lock().unwrap().is_empty());

    alice.disconnect();
    carol.disconnect();
}
