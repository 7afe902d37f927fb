// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Plexo integration tests.
//!
//! `BridgeHarness` assembles a full bridge stack over temp storage;
//! `StubService` and `LifecycleLog` script registry lifecycle scenarios.

pub mod harness;
pub mod stub;

pub use harness::{BridgeHarness, BridgeHarnessBuilder};
pub use stub::{LifecycleLog, StubService};
