// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal WebSocket session relay for Plexo collaboration.
//!
//! The collaboration wire protocol expects a server that echoes each
//! participant's events to the other participants of the session. This crate
//! is that server, and nothing more: no auth, no persistence, no payload
//! interpretation.

pub mod server;
pub mod ws;

pub use server::{router, serve, start_server, RelayState};
