// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog of known plugin modules and their placed instances.
//!
//! The catalog is the broker's source of truth for which module ids are
//! valid, which instances exist on the current page set, and which message
//! schemas a module declares. Resolution is decided once per lookup into a
//! tagged [`ResolvedModule`], never re-derived by duck typing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use plexo_core::{
    parse_module_manifest, InstanceId, ModuleId, ModuleManifest, PlexoError, ResolvedModule,
};
use tracing::{debug, warn};

/// Registry of module manifests and placed instances.
pub struct ModuleCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Default)]
struct CatalogInner {
    modules: HashMap<ModuleId, ResolvedModule>,
    instances: HashMap<InstanceId, ModuleId>,
}

impl ModuleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner::default()),
        }
    }

    /// Register a loaded module manifest. Re-registration overwrites with a
    /// warning (mirrors the service registry contract).
    pub fn register_module(&self, manifest: ModuleManifest) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let id = manifest.module_id.clone();
        if inner.modules.contains_key(&id) {
            warn!(module = %id, "module re-registered, overwriting previous manifest");
        }
        inner.modules.insert(id, ResolvedModule::Loaded(manifest));
    }

    /// Record a module whose manifest failed to load, so lookups return
    /// `Invalid` instead of `Missing`.
    pub fn register_invalid(&self, module_id: ModuleId, reason: impl Into<String>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.modules.insert(
            module_id.clone(),
            ResolvedModule::Invalid {
                module_id,
                reason: reason.into(),
            },
        );
    }

    /// Resolve a module id to its load-time decision.
    pub fn resolve(&self, module_id: &ModuleId) -> ResolvedModule {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .modules
            .get(module_id)
            .cloned()
            .unwrap_or_else(|| ResolvedModule::Missing(module_id.clone()))
    }

    /// Register a placed instance of a module.
    ///
    /// The module must resolve to a loaded manifest; placements of missing
    /// or invalid modules are rejected.
    pub fn register_instance(
        &self,
        instance_id: InstanceId,
        module_id: ModuleId,
    ) -> Result<(), PlexoError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match inner.modules.get(&module_id) {
            Some(ResolvedModule::Loaded(_)) => {
                inner.instances.insert(instance_id, module_id);
                Ok(())
            }
            Some(ResolvedModule::Invalid { reason, .. }) => Err(PlexoError::UnknownModule(
                format!("{module_id} (invalid: {reason})"),
            )),
            _ => Err(PlexoError::UnknownModule(module_id.to_string())),
        }
    }

    /// Remove a placed instance. Returns true if it existed.
    pub fn remove_instance(&self, instance_id: &InstanceId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.instances.remove(instance_id).is_some()
    }

    /// True if the instance is currently placed.
    pub fn contains_instance(&self, instance_id: &InstanceId) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.instances.contains_key(instance_id)
    }

    /// The module an instance was placed from.
    pub fn instance_module(&self, instance_id: &InstanceId) -> Option<ModuleId> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.instances.get(instance_id).cloned()
    }

    /// The manifest backing an instance, when its module loaded cleanly.
    pub fn instance_manifest(&self, instance_id: &InstanceId) -> Option<ModuleManifest> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let module_id = inner.instances.get(instance_id)?;
        match inner.modules.get(module_id) {
            Some(ResolvedModule::Loaded(manifest)) => Some(manifest.clone()),
            _ => None,
        }
    }

    /// Load every `*.toml` module manifest from a directory.
    ///
    /// Manifests that fail to parse are registered as invalid under a module
    /// id derived from the file stem, so later lookups return `Invalid`
    /// rather than `Missing`. Returns the number of cleanly loaded modules.
    pub fn load_modules_from_dir(&self, dir: &Path) -> Result<usize, PlexoError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            PlexoError::Config(format!("cannot read modules dir {}: {e}", dir.display()))
        })?;

        let mut loaded = 0;
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable module manifest skipped");
                    continue;
                }
            };

            match parse_module_manifest(&content) {
                Ok(manifest) => {
                    debug!(module = %manifest.module_id, path = %path.display(), "module loaded");
                    self.register_module(manifest);
                    loaded += 1;
                }
                Err(e) => {
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warn!(path = %path.display(), error = %e, "invalid module manifest");
                    self.register_invalid(ModuleId(stem), e.to_string());
                }
            }
        }

        Ok(loaded)
    }

    /// Number of registered modules.
    pub fn module_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.modules.len()
    }

    /// Number of placed instances.
    pub fn instance_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.instances.len()
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(id: &str) -> ModuleManifest {
        ModuleManifest {
            module_id: ModuleId(id.to_string()),
            name: id.to_string(),
            version: "0.1.0".to_string(),
            description: String::new(),
            required_services: vec![],
            sends: vec![],
            receives: vec![],
        }
    }

    #[test]
    fn resolve_unknown_module_is_missing() {
        let catalog = ModuleCatalog::new();
        let resolved = catalog.resolve(&ModuleId("ghost".into()));
        assert!(matches!(resolved, ResolvedModule::Missing(_)));
    }

    #[test]
    fn register_and_resolve_module() {
        let catalog = ModuleCatalog::new();
        catalog.register_module(manifest("chart"));
        let resolved = catalog.resolve(&ModuleId("chart".into()));
        assert!(resolved.manifest().is_some());
    }

    #[test]
    fn invalid_module_resolves_invalid_and_rejects_placement() {
        let catalog = ModuleCatalog::new();
        catalog.register_invalid(ModuleId("broken".into()), "parse error");

        let resolved = catalog.resolve(&ModuleId("broken".into()));
        assert!(matches!(resolved, ResolvedModule::Invalid { .. }));

        let err = catalog
            .register_instance(InstanceId("b1".into()), ModuleId("broken".into()))
            .unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn instance_placement_roundtrip() {
        let catalog = ModuleCatalog::new();
        catalog.register_module(manifest("chart"));
        catalog
            .register_instance(InstanceId("c1".into()), ModuleId("chart".into()))
            .unwrap();

        assert!(catalog.contains_instance(&InstanceId("c1".into())));
        assert_eq!(
            catalog.instance_module(&InstanceId("c1".into())),
            Some(ModuleId("chart".into()))
        );
        assert!(catalog
            .instance_manifest(&InstanceId("c1".into()))
            .is_some());

        assert!(catalog.remove_instance(&InstanceId("c1".into())));
        assert!(!catalog.contains_instance(&InstanceId("c1".into())));
    }

    #[test]
    fn load_modules_from_dir_handles_valid_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("chart.toml"),
            r#"
[module]
module_id = "chart"
name = "Chart"
version = "1.0.0"
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not [ valid toml").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = ModuleCatalog::new();
        let loaded = catalog.load_modules_from_dir(dir.path()).unwrap();

        assert_eq!(loaded, 1);
        assert!(catalog.resolve(&ModuleId("chart".into())).manifest().is_some());
        assert!(matches!(
            catalog.resolve(&ModuleId("broken".into())),
            ResolvedModule::Invalid { .. }
        ));
    }

    #[test]
    fn load_modules_from_missing_dir_errors() {
        let catalog = ModuleCatalog::new();
        assert!(catalog
            .load_modules_from_dir(Path::new("/nonexistent/modules"))
            .is_err());
    }

    #[test]
    fn placing_instance_of_unknown_module_fails() {
        let catalog = ModuleCatalog::new();
        let err = catalog
            .register_instance(InstanceId("x".into()), ModuleId("ghost".into()))
            .unwrap_err();
        assert!(matches!(err, PlexoError::UnknownModule(_)));
    }
}
