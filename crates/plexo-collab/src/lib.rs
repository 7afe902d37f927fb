// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time collaboration for the Plexo service bridge.
//!
//! A WebSocket client joins a session on a relay server, mirrors cursor,
//! selection, and layout events to the other participants, and maintains
//! ephemeral presence state. Unexpected disconnects feed an exponential
//! backoff reconnect machine; incoming layout changes are dispatched
//! according to the configured conflict policy.

pub mod client;
pub mod events;
pub mod state;

pub use client::{CollaborationService, ConnectionStatus, EventSubscription};
pub use events::{event_types, CollabEvent};
pub use state::{CollaborationState, Collaborator, CollaboratorCursor, CollaboratorSelection};
