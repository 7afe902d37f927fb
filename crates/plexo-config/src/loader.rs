// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./plexo.toml` > `~/.config/plexo/plexo.toml` > `/etc/plexo/plexo.toml`
//! with environment variable overrides via `PLEXO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PlexoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/plexo/plexo.toml` (system-wide)
/// 3. `~/.config/plexo/plexo.toml` (user XDG config)
/// 4. `./plexo.toml` (local directory)
/// 5. `PLEXO_*` environment variables
pub fn load_config() -> Result<PlexoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<PlexoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlexoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PlexoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlexoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PlexoConfig::default()))
        .merge(Toml::file("/etc/plexo/plexo.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("plexo/plexo.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("plexo.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PLEXO_STATE_DATABASE_PATH` must map to
/// `state.database_path`, not `state.database.path`.
fn env_provider() -> Env {
    Env::prefixed("PLEXO_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bridge_", "bridge.", 1)
            .replacen("state_", "state.", 1)
            .replacen("collab_", "collab.", 1)
            .replacen("relay_", "relay.", 1);
        mapped.into()
    })
}
