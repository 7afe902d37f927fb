// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end bridge testing.
//!
//! `BridgeHarness` assembles a complete bridge stack: service registry with
//! the state and broker services registered, module catalog, and message
//! broker over a temp SQLite database (or memory). Mirrors the composition
//! the `plexo` binary performs at startup.

use std::sync::Arc;

use plexo_bus::{BusService, MessageBroker, ModuleCatalog};
use plexo_config::model::{PlexoConfig, StateBackend};
use plexo_core::{ModuleManifest, PlexoError, ServiceContext};
use plexo_registry::ServiceRegistry;
use plexo_state::{StateManager, StateService};

/// Builder for creating test bridges with configurable options.
pub struct BridgeHarnessBuilder {
    backend: StateBackend,
    history_cap: usize,
    modules: Vec<ModuleManifest>,
    instances: Vec<(String, String)>,
}

impl BridgeHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: StateBackend::Memory,
            history_cap: 256,
            modules: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Use a temp SQLite database instead of the in-memory store.
    pub fn with_sqlite(mut self) -> Self {
        self.backend = StateBackend::Sqlite;
        self
    }

    /// Override the broker's message history cap.
    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    /// Register a module manifest before startup.
    pub fn with_module(mut self, manifest: ModuleManifest) -> Self {
        self.modules.push(manifest);
        self
    }

    /// Place an instance of a module before startup.
    pub fn with_instance(mut self, instance_id: &str, module_id: &str) -> Self {
        self.instances
            .push((instance_id.to_string(), module_id.to_string()));
        self
    }

    /// Build the harness: open storage, register services, initialize all.
    pub async fn build(self) -> Result<BridgeHarness, PlexoError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| PlexoError::Storage {
            source: Box::new(e),
        })?;

        let mut config = PlexoConfig::default();
        config.bridge.message_history_cap = self.history_cap;
        config.state.backend = self.backend;
        config.state.database_path = temp_dir
            .path()
            .join("state.db")
            .to_string_lossy()
            .into_owned();

        let state = Arc::new(StateService::from_config(&config.state).await?);
        let bus = Arc::new(BusService::new(config.bridge.message_history_cap, None));

        let registry = Arc::new(ServiceRegistry::new());
        let state_service: Arc<dyn plexo_core::BridgeService> = state.clone();
        registry.register(state_service);
        let bus_service: Arc<dyn plexo_core::BridgeService> = bus.clone();
        registry.register(bus_service);

        let catalog = bus.catalog();
        for manifest in self.modules {
            catalog.register_module(manifest);
        }
        for (instance_id, module_id) in self.instances {
            catalog.register_instance(instance_id.as_str().into(), module_id.as_str().into())?;
        }

        let broker = bus.broker();

        let ctx = ServiceContext::new();
        let failed = registry.initialize_all(&ctx).await?;
        if !failed.is_empty() {
            return Err(PlexoError::Internal(format!(
                "harness services failed to initialize: {failed:?}"
            )));
        }

        Ok(BridgeHarness {
            registry,
            catalog,
            broker,
            state,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete bridge environment over temp storage.
pub struct BridgeHarness {
    /// Service registry with the state service registered and initialized.
    pub registry: Arc<ServiceRegistry>,
    /// Module catalog backing the broker.
    pub catalog: Arc<ModuleCatalog>,
    /// Message broker wired to the catalog.
    pub broker: Arc<MessageBroker>,
    /// The state service (also reachable via the registry as "state").
    pub state: Arc<StateService>,
    /// Effective configuration.
    pub config: PlexoConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl BridgeHarness {
    /// Create a new builder.
    pub fn builder() -> BridgeHarnessBuilder {
        BridgeHarnessBuilder::new()
    }

    /// Shorthand for the managed state instance.
    pub fn state_manager(&self) -> Arc<StateManager> {
        self.state.manager()
    }

    /// Tear down services in reverse dependency order.
    pub async fn shutdown(&self) -> Result<(), PlexoError> {
        self.registry.cleanup_all().await
    }
}
