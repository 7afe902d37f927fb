// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced and periodic snapshot persistence.
//!
//! One owned task carries both timers: a debounce write shortly after each
//! mutation, and a periodic full sync as a safety net. The task is cancelled
//! through a [`CancellationToken`] rather than scattered timer handles.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::manager::StateManager;

/// Owns the background persistence task for one [`StateManager`].
pub struct Autosaver {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Autosaver {
    /// Spawn the autosave task.
    ///
    /// After each mutation the task waits out `debounce` and persists; a
    /// burst of mutations within the window coalesces into one write.
    /// Independently, a full sync runs every `sync_interval`.
    pub fn spawn(
        manager: Arc<StateManager>,
        debounce: Duration,
        sync_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut sync = interval_at(Instant::now() + sync_interval, sync_interval);
            sync.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = manager.dirty_notified() => {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = tokio::time::sleep(debounce) => {
                                manager.persist_logged().await;
                            }
                        }
                    }
                    _ = sync.tick() => {
                        manager.persist_logged().await;
                    }
                }
            }
            debug!("autosaver stopped");
        });

        Self { cancel, handle }
    }

    /// Cancel the task and wait for it to finish. Pending debounced writes
    /// are abandoned; callers persist explicitly at shutdown.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
