// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service registry: named singletons with dependency-ordered lifecycle.
//!
//! Services register once (re-registration overwrites with a warning), are
//! initialized in dependency order with per-node failure isolation, and are
//! cleaned up in exact reverse order. A dependency cycle is the only fatal
//! condition.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use plexo_core::{BridgeService, PlexoError, ServiceContext};
use tracing::{debug, warn};

use crate::metrics::ServiceMetrics;
use crate::order::topo_sort;

/// Result of resolving a set of required service names.
#[derive(Debug, Default)]
pub struct DependencyResolution {
    /// Names that resolved to registered services.
    pub resolved: Vec<String>,
    /// Names with no registered service.
    pub missing: Vec<String>,
    /// Diagnostics for resolved services whose own declared dependencies are
    /// not registered.
    pub errors: Vec<String>,
}

impl DependencyResolution {
    /// True when every requested name resolved cleanly.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.errors.is_empty()
    }
}

struct ServiceEntry {
    service: Arc<dyn BridgeService>,
    metrics: ServiceMetrics,
}

/// Registry of named bridge services.
pub struct ServiceRegistry {
    entries: RwLock<HashMap<String, ServiceEntry>>,
}

impl ServiceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a service under its own name.
    ///
    /// Re-registering an existing name overwrites the previous service and
    /// resets its metrics; this is logged as a warning, not an error.
    pub fn register(&self, service: Arc<dyn BridgeService>) {
        let name = service.name().to_string();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(&name) {
            warn!(service = %name, "service re-registered, overwriting previous registration");
        }
        entries.insert(
            name,
            ServiceEntry {
                service,
                metrics: ServiceMetrics::default(),
            },
        );
    }

    /// Remove a service. Returns true if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(name).is_some()
    }

    /// Fetch a service by name, recording last-access time and cumulative
    /// lookup time in its metrics.
    pub fn get(&self, name: &str) -> Option<Arc<dyn BridgeService>> {
        let started = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get_mut(name)?;
        let service = Arc::clone(&entry.service);
        entry.metrics.record_access(started.elapsed());
        Some(service)
    }

    /// Snapshot the metrics recorded for a service.
    pub fn metrics(&self, name: &str) -> Option<ServiceMetrics> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).map(|e| e.metrics.clone())
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True when no services are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a set of required service names.
    ///
    /// Each name is classified as resolved or missing; a resolved service
    /// whose own declared dependencies are unregistered contributes an entry
    /// to `errors` (it will fail to initialize).
    pub fn resolve_dependencies(&self, names: &[&str]) -> DependencyResolution {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut resolution = DependencyResolution::default();

        for &name in names {
            match entries.get(name) {
                None => resolution.missing.push(name.to_string()),
                Some(entry) => {
                    for dep in entry.service.dependencies() {
                        if !entries.contains_key(dep) {
                            resolution.errors.push(format!(
                                "service `{name}` depends on unregistered service `{dep}`"
                            ));
                        }
                    }
                    resolution.resolved.push(name.to_string());
                }
            }
        }

        resolution
    }

    /// Compute the initialization order across all registered services.
    ///
    /// A dependency cycle is fatal and returns an error naming a participant.
    pub fn init_order(&self) -> Result<Vec<String>, PlexoError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let graph: HashMap<String, Vec<String>> = entries
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    entry
                        .service
                        .dependencies()
                        .iter()
                        .map(|d| d.to_string())
                        .collect(),
                )
            })
            .collect();
        drop(entries);
        topo_sort(&graph)
    }

    /// Initialize all registered services in dependency order.
    ///
    /// A service whose declared dependencies are not all registered is
    /// skipped with an error recorded. A failing `initialize` records the
    /// error against that service and continues with the rest; failure
    /// isolation is per-node. Only a dependency cycle aborts the pass.
    ///
    /// Returns the names of services that failed or were skipped.
    pub async fn initialize_all(&self, ctx: &ServiceContext) -> Result<Vec<String>, PlexoError> {
        let order = self.init_order()?;
        let mut failed = Vec::new();

        for name in &order {
            let Some(service) = self.service_handle(name) else {
                continue; // unregistered concurrently
            };

            let missing: Vec<&str> = service
                .dependencies()
                .iter()
                .copied()
                .filter(|dep| !self.contains(dep))
                .collect();
            if !missing.is_empty() {
                warn!(
                    service = %name,
                    missing = ?missing,
                    "skipping initialization, required services not registered"
                );
                self.record_error(name);
                failed.push(name.clone());
                continue;
            }

            match service.initialize(ctx).await {
                Ok(()) => {
                    debug!(service = %name, "service initialized");
                    self.mark_initialized(name);
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "service initialization failed");
                    self.record_error(name);
                    failed.push(name.clone());
                }
            }
        }

        Ok(failed)
    }

    /// Clean up all registered services in exact reverse initialization
    /// order. Failures are recorded per-service and never abort the pass.
    pub async fn cleanup_all(&self) -> Result<(), PlexoError> {
        let mut order = self.init_order()?;
        order.reverse();

        for name in &order {
            let Some(service) = self.service_handle(name) else {
                continue;
            };
            if let Err(e) = service.cleanup().await {
                warn!(service = %name, error = %e, "service cleanup failed");
                self.record_error(name);
            } else {
                debug!(service = %name, "service cleaned up");
            }
        }

        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    fn service_handle(&self, name: &str) -> Option<Arc<dyn BridgeService>> {
        // Unlike `get`, lifecycle traversal does not count as an access.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).map(|e| Arc::clone(&e.service))
    }

    fn record_error(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(name) {
            entry.metrics.record_error();
        }
    }

    fn mark_initialized(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(name) {
            entry.metrics.initialized = true;
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct PlainService {
        name: &'static str,
        deps: Vec<&'static str>,
    }

    #[async_trait]
    impl BridgeService for PlainService {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.deps.clone()
        }
    }

    fn plain(name: &'static str, deps: &[&'static str]) -> Arc<dyn BridgeService> {
        Arc::new(PlainService {
            name,
            deps: deps.to_vec(),
        })
    }

    #[test]
    fn register_get_unregister_roundtrip() {
        let registry = ServiceRegistry::new();
        registry.register(plain("state", &[]));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("state").is_some());
        assert!(registry.get("missing").is_none());

        assert!(registry.unregister("state"));
        assert!(!registry.unregister("state"));
        assert!(registry.is_empty());
    }

    #[test]
    fn reregistration_overwrites() {
        let registry = ServiceRegistry::new();
        registry.register(plain("state", &[]));
        registry.register(plain("state", &["broker"]));

        assert_eq!(registry.len(), 1);
        let svc = registry.get("state").unwrap();
        assert_eq!(svc.dependencies(), vec!["broker"]);
    }

    #[test]
    fn get_records_metrics() {
        let registry = ServiceRegistry::new();
        registry.register(plain("state", &[]));

        let before = registry.metrics("state").unwrap();
        assert!(before.last_access.is_none());

        registry.get("state").unwrap();
        registry.get("state").unwrap();

        let after = registry.metrics("state").unwrap();
        assert!(after.last_access.is_some());
        assert_eq!(after.error_count, 0);
    }

    #[test]
    fn resolve_dependencies_classifies_names() {
        let registry = ServiceRegistry::new();
        registry.register(plain("state", &[]));
        registry.register(plain("api", &["ghost"]));

        let resolution = registry.resolve_dependencies(&["state", "api", "unknown"]);
        assert_eq!(resolution.resolved, vec!["state", "api"]);
        assert_eq!(resolution.missing, vec!["unknown"]);
        assert_eq!(resolution.errors.len(), 1);
        assert!(resolution.errors[0].contains("ghost"));
        assert!(!resolution.is_complete());
    }

    #[test]
    fn init_order_respects_dependencies() {
        let registry = ServiceRegistry::new();
        registry.register(plain("api", &["auth"]));
        registry.register(plain("auth", &["state"]));
        registry.register(plain("state", &[]));

        let order = registry.init_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("state") < pos("auth"));
        assert!(pos("auth") < pos("api"));
    }

    #[test]
    fn cycle_is_fatal() {
        let registry = ServiceRegistry::new();
        registry.register(plain("a", &["b"]));
        registry.register(plain("b", &["a"]));

        let err = registry.init_order().unwrap_err();
        assert!(matches!(err, PlexoError::DependencyCycle { .. }));
    }

    #[tokio::test]
    async fn missing_dependency_skips_but_does_not_abort() {
        let registry = ServiceRegistry::new();
        registry.register(plain("orphan", &["ghost"]));
        registry.register(plain("healthy", &[]));

        let ctx = ServiceContext::new();
        let failed = registry.initialize_all(&ctx).await.unwrap();
        assert_eq!(failed, vec!["orphan"]);

        assert_eq!(registry.metrics("orphan").unwrap().error_count, 1);
        assert!(!registry.metrics("orphan").unwrap().initialized);
        assert!(registry.metrics("healthy").unwrap().initialized);
    }
}
