// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay HTTP server built on axum.
//!
//! One route: `GET /session/{session_id}` upgrades to WebSocket and joins
//! that session's room. The relay holds no persistent state; rooms exist
//! while they have participants.

use std::sync::Arc;

use axum::{routing::get, Router};
use dashmap::DashMap;
use plexo_config::model::RelayConfig;
use plexo_core::PlexoError;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::ws;

/// One session's participants: connection id -> outbound frame sender.
pub type Room = Arc<DashMap<String, mpsc::Sender<String>>>;

/// Shared state for the relay handlers.
#[derive(Clone, Default)]
pub struct RelayState {
    /// session_id -> room.
    pub rooms: Arc<DashMap<String, Room>>,
}

impl RelayState {
    /// Create empty relay state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the room for a session.
    pub fn room(&self, session_id: &str) -> Room {
        self.rooms
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop a participant; empty rooms are removed.
    pub fn leave(&self, session_id: &str, connection_id: &str) {
        if let Some(room) = self.rooms.get(session_id) {
            room.remove(connection_id);
            if room.is_empty() {
                drop(room);
                self.rooms
                    .remove_if(session_id, |_, room| room.is_empty());
            }
        }
    }
}

/// Build the relay router over the given state.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/session/{session_id}", get(ws::session_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serve the relay on an already-bound listener. Used directly by tests.
pub async fn serve(listener: TcpListener, state: RelayState) -> Result<(), PlexoError> {
    axum::serve(listener, router(state))
        .await
        .map_err(|e| PlexoError::Connection {
            message: format!("relay server error: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Bind and serve the relay per configuration.
pub async fn start_server(config: &RelayConfig) -> Result<(), PlexoError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| PlexoError::Connection {
            message: format!("failed to bind relay to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("relay server listening on {addr}");
    serve(listener, RelayState::new()).await
}
