// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Plexo service bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Plexo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlexoConfig {
    /// Bridge identity and message broker settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// State manager and persistence settings.
    #[serde(default)]
    pub state: StateConfig,

    /// Collaboration client settings.
    #[serde(default)]
    pub collab: CollabConfig,

    /// Relay server settings.
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Bridge identity and message broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Display name of this bridge instance.
    #[serde(default = "default_bridge_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum retained messages per history list. Older entries are evicted.
    #[serde(default = "default_message_history_cap")]
    pub message_history_cap: usize,

    /// Directory of `*.toml` module manifests loaded at startup.
    /// `None` starts with an empty catalog.
    #[serde(default)]
    pub modules_dir: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_bridge_name(),
            log_level: default_log_level(),
            message_history_cap: default_message_history_cap(),
            modules_dir: None,
        }
    }
}

fn default_bridge_name() -> String {
    "plexo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_message_history_cap() -> usize {
    256
}

/// Persistence backend selection for the state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// In-memory only; persist/restore are no-ops beyond the live maps.
    Memory,
    /// SQLite-backed snapshot storage.
    Sqlite,
}

/// State manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// Which persistence backend to use.
    #[serde(default = "default_state_backend")]
    pub backend: StateBackend,

    /// Path to the SQLite database file (sqlite backend only).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Storage key the snapshot is persisted under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Debounce window after a mutation before a snapshot write, in ms.
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    /// Periodic full-sync interval, in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Maximum retained point-in-time snapshots for rollback.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_state_backend(),
            database_path: default_database_path(),
            storage_key: default_storage_key(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            sync_interval_secs: default_sync_interval_secs(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_state_backend() -> StateBackend {
    StateBackend::Sqlite
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("plexo").join("state.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("plexo-state.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_storage_key() -> String {
    "unified-renderer-state".to_string()
}

fn default_autosave_debounce_ms() -> u64 {
    1000
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_history_limit() -> usize {
    50
}

/// Policy applied to incoming layout-change events that conflict with local
/// edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Apply the incoming layout immediately.
    LastWriteWins,
    /// Emit a merge-intent event for the caller to reconcile.
    AutoMerge,
    /// Emit a conflict event and wait for explicit resolution.
    Manual,
}

/// Collaboration client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollabConfig {
    /// Enable the collaboration client. Opt-in feature.
    #[serde(default)]
    pub enabled: bool,

    /// WebSocket URL of the relay server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Heartbeat send interval while connected, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Base reconnect delay; attempt n waits base * 2^n, in ms.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Reconnect attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Conflict resolution policy for incoming layout changes.
    #[serde(default = "default_conflict_policy")]
    pub conflict_policy: ConflictPolicy,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: default_server_url(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            conflict_policy: default_conflict_policy(),
        }
    }
}

fn default_server_url() -> String {
    "ws://127.0.0.1:4820".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    15
}

fn default_reconnect_base_delay_ms() -> u64 {
    500
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_conflict_policy() -> ConflictPolicy {
    ConflictPolicy::LastWriteWins
}

/// Relay server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Address to bind the relay server to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on.
    #[serde(default = "default_relay_port")]
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_relay_port(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    4820
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = PlexoConfig::default();
        assert_eq!(config.bridge.name, "plexo");
        assert_eq!(config.bridge.message_history_cap, 256);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
        assert_eq!(config.state.storage_key, "unified-renderer-state");
        assert_eq!(config.state.autosave_debounce_ms, 1000);
        assert_eq!(config.state.sync_interval_secs, 30);
        assert_eq!(config.state.history_limit, 50);
        assert!(!config.collab.enabled);
        assert_eq!(config.collab.max_reconnect_attempts, 5);
        assert_eq!(config.collab.conflict_policy, ConflictPolicy::LastWriteWins);
        assert_eq!(config.relay.port, 4820);
    }

    #[test]
    fn conflict_policy_parses_kebab_case() {
        let toml = r#"
[collab]
conflict_policy = "auto-merge"
"#;
        let config: PlexoConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.collab.conflict_policy, ConflictPolicy::AutoMerge);
    }

    #[test]
    fn state_backend_parses_lowercase() {
        let toml = r#"
[state]
backend = "memory"
"#;
        let config: PlexoConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.state.backend, StateBackend::Memory);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml = r#"
[bridge]
nme = "oops"
"#;
        assert!(toml::from_str::<PlexoConfig>(toml).is_err());
    }
}
