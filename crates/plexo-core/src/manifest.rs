// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Module manifest parsing from `module.toml` files.
//!
//! A module manifest describes one plugin module: the services it requires
//! from the bridge and the message schemas it sends and accepts.

use serde::{Deserialize, Serialize};

use crate::error::PlexoError;
use crate::types::{MessageSchema, ModuleId};

/// Parsed manifest describing a plugin module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Unique module identifier (e.g., "chart", "data-table").
    pub module_id: ModuleId,
    /// Human-readable display name.
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Named bridge services this module needs resolved before use.
    #[serde(default)]
    pub required_services: Vec<String>,
    /// Schemas for message types this module emits.
    #[serde(default)]
    pub sends: Vec<MessageSchema>,
    /// Schemas for message types this module accepts. Incoming messages are
    /// validated against the matching entry before delivery.
    #[serde(default)]
    pub receives: Vec<MessageSchema>,
}

impl ModuleManifest {
    /// Find the `receives` schema covering the given message type, if any.
    pub fn receives_schema(&self, message_type: &str) -> Option<&MessageSchema> {
        self.receives.iter().find(|s| s.name == message_type)
    }
}

/// A module lookup result, decided once at catalog load time.
///
/// Replaces repeated duck-typed "is this a renderable component" checks with
/// a tagged variant consumers can match on.
#[derive(Debug, Clone)]
pub enum ResolvedModule {
    /// Manifest loaded and valid.
    Loaded(ModuleManifest),
    /// No manifest registered under this id.
    Missing(ModuleId),
    /// A manifest exists but failed validation.
    Invalid { module_id: ModuleId, reason: String },
}

impl ResolvedModule {
    /// Returns the manifest when the module loaded cleanly.
    pub fn manifest(&self) -> Option<&ModuleManifest> {
        match self {
            ResolvedModule::Loaded(manifest) => Some(manifest),
            _ => None,
        }
    }
}

/// Intermediate TOML deserialization struct for `module.toml`.
#[derive(Debug, Deserialize)]
struct ModuleManifestFile {
    module: ModuleSection,
}

/// The `[module]` section of a `module.toml` file.
#[derive(Debug, Deserialize)]
struct ModuleSection {
    module_id: String,
    name: String,
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required_services: Vec<String>,
    #[serde(default)]
    sends: Vec<MessageSchema>,
    #[serde(default)]
    receives: Vec<MessageSchema>,
}

/// Parse a module manifest from TOML content.
///
/// Validates that module_id and version are non-empty and that schema names
/// within `sends` and `receives` are unique.
pub fn parse_module_manifest(toml_content: &str) -> Result<ModuleManifest, PlexoError> {
    let file: ModuleManifestFile = toml::from_str(toml_content)
        .map_err(|e| PlexoError::Config(format!("invalid module manifest: {e}")))?;

    let section = file.module;

    if section.module_id.is_empty() {
        return Err(PlexoError::Config(
            "module manifest: module_id must not be empty".to_string(),
        ));
    }

    if section.version.is_empty() {
        return Err(PlexoError::Config(
            "module manifest: version must not be empty".to_string(),
        ));
    }

    if semver::Version::parse(&section.version).is_err() {
        return Err(PlexoError::Config(format!(
            "module manifest `{}`: version `{}` is not a valid semantic version",
            section.module_id, section.version
        )));
    }

    check_unique_schema_names(&section.module_id, "sends", &section.sends)?;
    check_unique_schema_names(&section.module_id, "receives", &section.receives)?;

    Ok(ModuleManifest {
        module_id: ModuleId(section.module_id),
        name: section.name,
        version: section.version,
        description: section.description,
        required_services: section.required_services,
        sends: section.sends,
        receives: section.receives,
    })
}

fn check_unique_schema_names(
    module_id: &str,
    direction: &str,
    schemas: &[MessageSchema],
) -> Result<(), PlexoError> {
    let mut seen = std::collections::HashSet::new();
    for schema in schemas {
        if !seen.insert(schema.name.as_str()) {
            return Err(PlexoError::Config(format!(
                "module manifest `{module_id}`: duplicate {direction} schema `{}`",
                schema.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_manifest() {
        let toml = r#"
[module]
module_id = "chart"
name = "Chart"
version = "1.2.0"
description = "Time-series chart widget"
required_services = ["state", "broker"]

[[module.sends]]
name = "chart:select"
fields = [{ name = "series", field_type = "string", required = true }]

[[module.receives]]
name = "data:update"
fields = [
    { name = "rows", field_type = "array", required = true },
    { name = "source", field_type = "string" },
]
"#;
        let manifest = parse_module_manifest(toml).unwrap();
        assert_eq!(manifest.module_id.0, "chart");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.required_services, vec!["state", "broker"]);
        assert_eq!(manifest.sends.len(), 1);
        assert_eq!(manifest.receives.len(), 1);

        let schema = manifest.receives_schema("data:update").unwrap();
        assert_eq!(schema.fields.len(), 2);
        assert!(schema.fields[0].required);
        assert!(!schema.fields[1].required);
    }

    #[test]
    fn parse_minimal_manifest() {
        let toml = r#"
[module]
module_id = "note"
name = "Sticky Note"
version = "0.1.0"
"#;
        let manifest = parse_module_manifest(toml).unwrap();
        assert!(manifest.required_services.is_empty());
        assert!(manifest.sends.is_empty());
        assert!(manifest.receives.is_empty());
        assert!(manifest.receives_schema("anything").is_none());
    }

    #[test]
    fn parse_empty_module_id_fails() {
        let toml = r#"
[module]
module_id = ""
name = "Bad"
version = "0.1.0"
"#;
        let err = parse_module_manifest(toml).unwrap_err();
        assert!(err.to_string().contains("module_id must not be empty"));
    }

    #[test]
    fn parse_empty_version_fails() {
        let toml = r#"
[module]
module_id = "bad"
name = "Bad"
version = ""
"#;
        let err = parse_module_manifest(toml).unwrap_err();
        assert!(err.to_string().contains("version must not be empty"));
    }

    #[test]
    fn parse_non_semver_version_fails() {
        let toml = r#"
[module]
module_id = "bad"
name = "Bad"
version = "one point two"
"#;
        let err = parse_module_manifest(toml).unwrap_err();
        assert!(err.to_string().contains("semantic version"));
    }

    #[test]
    fn duplicate_schema_names_fail() {
        let toml = r#"
[module]
module_id = "dup"
name = "Dup"
version = "0.1.0"

[[module.receives]]
name = "data:update"

[[module.receives]]
name = "data:update"
"#;
        let err = parse_module_manifest(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate receives schema"));
    }

    #[test]
    fn resolved_module_manifest_accessor() {
        let loaded = ResolvedModule::Loaded(ModuleManifest {
            module_id: ModuleId("chart".into()),
            name: "Chart".into(),
            version: "1.0.0".into(),
            description: String::new(),
            required_services: vec![],
            sends: vec![],
            receives: vec![],
        });
        assert!(loaded.manifest().is_some());

        let missing = ResolvedModule::Missing(ModuleId("gone".into()));
        assert!(missing.manifest().is_none());
    }
}
