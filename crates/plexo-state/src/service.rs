// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`BridgeService`] wrapper exposing the state manager to the registry.
//!
//! Initialization restores the last persisted snapshot and starts the
//! autosaver (persistent backends only); cleanup stops the autosaver and
//! writes a final snapshot. Persistence failures degrade to in-memory
//! operation, never to a failed service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plexo_config::model::{StateBackend, StateConfig};
use plexo_core::{BridgeService, PlexoError, ServiceContext};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::autosave::Autosaver;
use crate::manager::StateManager;
use crate::store::{MemoryStore, SqliteStore, StateStore};

/// The "state" bridge service.
pub struct StateService {
    manager: Arc<StateManager>,
    debounce: Duration,
    sync_interval: Duration,
    autosaver: Mutex<Option<Autosaver>>,
}

impl StateService {
    /// Service name in the registry.
    pub const NAME: &'static str = "state";

    /// Build the service from configuration, opening the configured backend.
    pub async fn from_config(config: &StateConfig) -> Result<Self, PlexoError> {
        let store: Arc<dyn StateStore> = match config.backend {
            StateBackend::Memory => Arc::new(MemoryStore::new()),
            StateBackend::Sqlite => Arc::new(SqliteStore::open(&config.database_path).await?),
        };
        Ok(Self::new(store, config))
    }

    /// Build the service over an explicit store (used by tests and the
    /// harness).
    pub fn new(store: Arc<dyn StateStore>, config: &StateConfig) -> Self {
        let manager = Arc::new(StateManager::new(
            store,
            config.storage_key.clone(),
            config.history_limit,
        ));
        Self {
            manager,
            debounce: Duration::from_millis(config.autosave_debounce_ms),
            sync_interval: Duration::from_secs(config.sync_interval_secs),
            autosaver: Mutex::new(None),
        }
    }

    /// The managed state instance.
    pub fn manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.manager)
    }
}

#[async_trait]
impl BridgeService for StateService {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, _ctx: &ServiceContext) -> Result<(), PlexoError> {
        if let Err(e) = self.manager.restore().await {
            warn!(error = %e, "snapshot restore failed, starting with empty state");
        }

        if self.manager.is_persistent() {
            let mut autosaver = self.autosaver.lock().await;
            if autosaver.is_none() {
                *autosaver = Some(Autosaver::spawn(
                    Arc::clone(&self.manager),
                    self.debounce,
                    self.sync_interval,
                ));
                info!(
                    debounce_ms = self.debounce.as_millis() as u64,
                    sync_interval_secs = self.sync_interval.as_secs(),
                    "state autosave started"
                );
            }
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PlexoError> {
        if let Some(autosaver) = self.autosaver.lock().await.take() {
            autosaver.shutdown().await;
        }
        self.manager.persist_logged().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexo_core::InstanceId;
    use serde_json::json;

    fn memory_config() -> StateConfig {
        StateConfig {
            backend: StateBackend::Memory,
            ..StateConfig::default()
        }
    }

    #[tokio::test]
    async fn memory_backend_skips_autosaver() {
        let service = StateService::from_config(&memory_config()).await.unwrap();
        let ctx = ServiceContext::new();
        service.initialize(&ctx).await.unwrap();

        assert!(service.autosaver.lock().await.is_none());
        service.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn sqlite_backend_persists_across_service_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = StateConfig {
            backend: StateBackend::Sqlite,
            database_path: dir.path().join("svc.db").to_string_lossy().into_owned(),
            ..StateConfig::default()
        };

        {
            let service = StateService::from_config(&config).await.unwrap();
            let ctx = ServiceContext::new();
            service.initialize(&ctx).await.unwrap();
            service
                .manager()
                .set_module_state(&InstanceId("m1".into()), json!({"x": 1}));
            // Cleanup writes the final snapshot.
            service.cleanup().await.unwrap();
        }

        let service = StateService::from_config(&config).await.unwrap();
        let ctx = ServiceContext::new();
        service.initialize(&ctx).await.unwrap();
        assert_eq!(
            service.manager().get_module_state(&InstanceId("m1".into())),
            Some(json!({"x": 1}))
        );
        service.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn service_registers_under_expected_name() {
        let service = StateService::from_config(&memory_config()).await.unwrap();
        assert_eq!(service.name(), "state");
        assert!(service.dependencies().is_empty());
    }
}
