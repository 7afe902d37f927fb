// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`BridgeService`] wrapper exposing the catalog and broker to the registry.
//!
//! Plugin modules resolve this service by name to reach the messaging layer.
//! Initialization loads module manifests from the configured directory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use plexo_core::{BridgeService, PlexoError, ServiceContext};
use tracing::info;

use crate::broker::MessageBroker;
use crate::catalog::ModuleCatalog;

/// The "broker" bridge service.
pub struct BusService {
    catalog: Arc<ModuleCatalog>,
    broker: Arc<MessageBroker>,
    modules_dir: Option<PathBuf>,
}

impl BusService {
    /// Service name in the registry.
    pub const NAME: &'static str = "broker";

    /// Create the service with an empty catalog.
    ///
    /// When `modules_dir` is set, `initialize` loads every `*.toml` manifest
    /// found there.
    pub fn new(history_cap: usize, modules_dir: Option<PathBuf>) -> Self {
        let catalog = Arc::new(ModuleCatalog::new());
        let broker = Arc::new(MessageBroker::new(Arc::clone(&catalog), history_cap));
        Self {
            catalog,
            broker,
            modules_dir,
        }
    }

    /// The module catalog.
    pub fn catalog(&self) -> Arc<ModuleCatalog> {
        Arc::clone(&self.catalog)
    }

    /// The message broker.
    pub fn broker(&self) -> Arc<MessageBroker> {
        Arc::clone(&self.broker)
    }
}

#[async_trait]
impl BridgeService for BusService {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn initialize(&self, _ctx: &ServiceContext) -> Result<(), PlexoError> {
        if let Some(dir) = &self.modules_dir {
            let loaded = self.catalog.load_modules_from_dir(dir)?;
            info!(modules = loaded, dir = %dir.display(), "module catalog loaded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexo_core::ModuleId;

    #[tokio::test]
    async fn initialize_without_modules_dir_is_empty() {
        let service = BusService::new(256, None);
        let ctx = ServiceContext::new();
        service.initialize(&ctx).await.unwrap();
        assert_eq!(service.catalog().module_count(), 0);
        assert_eq!(service.name(), "broker");
    }

    #[tokio::test]
    async fn initialize_loads_manifests_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("note.toml"),
            r#"
[module]
module_id = "note"
name = "Sticky Note"
version = "0.1.0"
"#,
        )
        .unwrap();

        let service = BusService::new(256, Some(dir.path().to_path_buf()));
        let ctx = ServiceContext::new();
        service.initialize(&ctx).await.unwrap();

        assert_eq!(service.catalog().module_count(), 1);
        assert!(service
            .catalog()
            .resolve(&ModuleId("note".into()))
            .manifest()
            .is_some());
    }

    #[tokio::test]
    async fn initialize_fails_on_unreadable_dir() {
        let service = BusService::new(256, Some(PathBuf::from("/nonexistent/modules")));
        let ctx = ServiceContext::new();
        assert!(service.initialize(&ctx).await.is_err());
    }
}
