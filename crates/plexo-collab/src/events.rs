// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaboration wire protocol: JSON events over WebSocket.
//!
//! Every event is `{type, user_id, timestamp, data}`. The relay server
//! echoes events to the other participants of a session; it never interprets
//! `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type constants for the collaboration wire protocol.
pub mod event_types {
    /// A participant joined the session.
    pub const JOIN: &str = "join";
    /// A participant left the session.
    pub const LEAVE: &str = "leave";
    /// Cursor moved.
    pub const CURSOR: &str = "cursor";
    /// Selection changed.
    pub const SELECTION: &str = "selection";
    /// Page layout changed.
    pub const LAYOUT: &str = "layout";
    /// A comment was added.
    pub const COMMENT: &str = "comment";
    /// Keep-alive, sent on a fixed interval while connected.
    pub const HEARTBEAT: &str = "heartbeat";

    // Synthesized locally, never sent on the wire.

    /// Emitted under the auto-merge policy: the caller reconciles.
    pub const MERGE_INTENT: &str = "merge-intent";
    /// Emitted under the manual policy: awaits explicit resolution.
    pub const CONFLICT: &str = "conflict";
}

/// One collaboration event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollabEvent {
    /// Event type; see [`event_types`].
    #[serde(rename = "type")]
    pub event_type: String,
    /// Originating user.
    pub user_id: String,
    /// RFC 3339 time the event was created.
    pub timestamp: String,
    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl CollabEvent {
    /// Create an event stamped with the current time.
    pub fn new(event_type: impl Into<String>, user_id: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data,
        }
    }
}
