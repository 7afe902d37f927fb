// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket session handler.
//!
//! Every text frame a participant sends is relayed verbatim to the *other*
//! participants of the same session, never echoed back to the sender. The
//! relay does not interpret event payloads beyond remembering the sender's
//! user id so it can synthesize a leave event on unclean disconnect.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::server::{RelayState, Room};

/// Upgrade handler for `GET /session/{session_id}`.
pub async fn session_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<RelayState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

/// Drive one participant connection.
async fn handle_socket(socket: WebSocket, state: RelayState, session_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let room = state.room(&session_id);
    let (tx, mut rx) = mpsc::channel::<String>(64);
    room.insert(connection_id.clone(), tx);
    debug!(session = %session_id, connection = %connection_id, "participant joined");

    // Forward queued frames to this participant.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // The last user id seen from this connection, for synthesized leave.
    let mut user_id: Option<String> = None;
    let mut sent_leave = false;

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => {
                let frame: &str = &text;
                match serde_json::from_str::<serde_json::Value>(frame) {
                    Ok(event) => {
                        if let Some(uid) = event.get("user_id").and_then(|v| v.as_str()) {
                            user_id = Some(uid.to_string());
                        }
                        if event.get("type").and_then(|v| v.as_str()) == Some("leave") {
                            sent_leave = true;
                        }
                    }
                    Err(e) => {
                        warn!(session = %session_id, error = %e, "unparseable frame relayed as-is");
                    }
                }
                relay_to_others(&room, &connection_id, frame.to_string()).await;
            }
            Message::Close(_) => break,
            _ => {} // binary, ping, pong
        }
    }

    // Unclean drops still announce departure to the rest of the room.
    if !sent_leave && let Some(uid) = user_id {
        let leave = serde_json::json!({
            "type": "leave",
            "user_id": uid,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "data": {}
        });
        relay_to_others(&room, &connection_id, leave.to_string()).await;
    }

    state.leave(&session_id, &connection_id);
    sender_task.abort();
    debug!(session = %session_id, connection = %connection_id, "participant left");
}

/// Push one frame to every participant except the sender.
async fn relay_to_others(room: &Room, sender_id: &str, frame: String) {
    // Collect first: sending while iterating would hold the shard lock
    // across an await.
    let peers: Vec<mpsc::Sender<String>> = room
        .iter()
        .filter(|entry| entry.key() != sender_id)
        .map(|entry| entry.value().clone())
        .collect();

    for peer in peers {
        if peer.send(frame.clone()).await.is_err() {
            // Receiver task ended; cleanup happens on its own disconnect path.
        }
    }
}
