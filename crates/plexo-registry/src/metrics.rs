// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-service observability counters.

use std::time::{Duration, Instant};

/// Metrics recorded for one registered service.
#[derive(Debug, Clone, Default)]
pub struct ServiceMetrics {
    /// Cumulative wall-clock time spent in registry lookups for this service.
    pub load_time: Duration,
    /// Lifecycle failures recorded against this service.
    pub error_count: u64,
    /// When the service was last fetched via `get`.
    pub last_access: Option<Instant>,
    /// Whether `initialize` completed successfully.
    pub initialized: bool,
}

impl ServiceMetrics {
    /// Record one lookup: bumps last-access and accumulates elapsed time.
    pub(crate) fn record_access(&mut self, elapsed: Duration) {
        self.last_access = Some(Instant::now());
        self.load_time += elapsed;
    }

    /// Record one lifecycle failure.
    pub(crate) fn record_error(&mut self) {
        self.error_count += 1;
    }
}
