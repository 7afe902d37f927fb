// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Plexo service bridge.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and Elm-style diagnostic error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use plexo_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Bridge name: {}", config.bridge.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ConflictPolicy, PlexoConfig, StateBackend};

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to rich miette diagnostics with typo suggestions
///
/// Returns either a valid `PlexoConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<PlexoConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<PlexoConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("plexo.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("plexo.toml").display().to_string())
            .unwrap_or_else(|_| "plexo.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("plexo/plexo.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = std::path::Path::new("/etc/plexo/plexo.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_inline_config_loads() {
        let config = load_and_validate_str(
            r#"
[bridge]
name = "studio"

[state]
backend = "memory"
"#,
        )
        .unwrap();
        assert_eq!(config.bridge.name, "studio");
        assert_eq!(config.state.backend, StateBackend::Memory);
    }

    #[test]
    fn typo_produces_a_diagnostic_naming_the_key() {
        let errors = load_and_validate_str(
            r#"
[state]
bakcend = "memory"
"#,
        )
        .unwrap_err();
        // Figment wraps serde's deny_unknown_fields error; however it is
        // classified, the diagnostic must name the offending key.
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.to_string().contains("bakcend")));
    }

    #[test]
    fn semantic_validation_runs_after_deserialization() {
        let errors = load_and_validate_str(
            r#"
[state]
history_limit = 0
"#,
        )
        .unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { .. })));
    }
}
