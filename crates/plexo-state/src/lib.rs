// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Three-tier state management for the Plexo service bridge.
//!
//! Module, page, and global state live in independent key-value tiers with
//! synchronous per-key subscriber notification. Snapshots persist through a
//! pluggable store (in-memory or WAL-mode SQLite with embedded migrations),
//! written on a debounce after each mutation plus a periodic full sync, and
//! a bounded history ring supports point-in-time rollback.

pub mod autosave;
pub mod database;
pub mod manager;
pub mod service;
pub mod snapshot;
pub mod store;

pub use autosave::Autosaver;
pub use database::Database;
pub use manager::{StateManager, SubscriptionId};
pub use service::StateService;
pub use snapshot::{StateSnapshot, SNAPSHOT_VERSION};
pub use store::{MemoryStore, SqliteStore, StateStore};
