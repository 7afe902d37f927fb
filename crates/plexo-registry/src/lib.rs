// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service registry for the Plexo bridge.
//!
//! Named services (state, messaging, collaboration, ...) are registered once,
//! resolved by name for plugin modules, initialized in dependency order, and
//! cleaned up in exact reverse order. Per-service metrics record lookup
//! times and lifecycle failures.

pub mod metrics;
pub mod order;
pub mod registry;

pub use metrics::ServiceMetrics;
pub use registry::{DependencyResolution, ServiceRegistry};
