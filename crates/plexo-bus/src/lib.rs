// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Module catalog and message broker for the Plexo service bridge.
//!
//! Plugin modules declare the message schemas they send and accept; placed
//! instances connect to each other through directed, typed edges; the broker
//! validates and fans out messages and keeps bounded per-instance and
//! per-module histories.

pub mod broker;
pub mod catalog;
pub mod service;

pub use broker::{MessageBroker, PluginConnection};
pub use catalog::ModuleCatalog;
pub use service::BusService;
