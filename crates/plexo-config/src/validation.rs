// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, valid bind addresses, and non-zero
//! limits.

use crate::diagnostic::ConfigError;
use crate::model::{PlexoConfig, StateBackend};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PlexoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.bridge.message_history_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "bridge.message_history_cap must be at least 1".to_string(),
        });
    }

    if config.state.backend == StateBackend::Sqlite
        && config.state.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "state.database_path must not be empty for the sqlite backend".to_string(),
        });
    }

    if config.state.storage_key.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "state.storage_key must not be empty".to_string(),
        });
    }

    if config.state.history_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "state.history_limit must be at least 1".to_string(),
        });
    }

    if config.collab.enabled {
        let url = config.collab.server_url.trim();
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            errors.push(ConfigError::Validation {
                message: format!(
                    "collab.server_url must start with ws:// or wss://, got `{url}`"
                ),
            });
        }
        if config.collab.heartbeat_interval_secs == 0 {
            errors.push(ConfigError::Validation {
                message: "collab.heartbeat_interval_secs must be at least 1".to_string(),
            });
        }
        if config.collab.reconnect_base_delay_ms == 0 {
            errors.push(ConfigError::Validation {
                message: "collab.reconnect_base_delay_ms must be at least 1".to_string(),
            });
        }
    }

    // Validate bind address looks like a valid IP or hostname.
    let addr = config.relay.bind_address.trim();
    if addr.is_empty() {
        errors.push(ConfigError::Validation {
            message: "relay.bind_address must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "relay.bind_address `{addr}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = PlexoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_history_cap_fails() {
        let mut config = PlexoConfig::default();
        config.bridge.message_history_cap = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("message_history_cap"))
        ));
    }

    #[test]
    fn empty_database_path_fails_for_sqlite() {
        let mut config = PlexoConfig::default();
        config.state.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn empty_database_path_is_fine_for_memory_backend() {
        let mut config = PlexoConfig::default();
        config.state.backend = StateBackend::Memory;
        config.state.database_path = "".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_server_url_fails_when_collab_enabled() {
        let mut config = PlexoConfig::default();
        config.collab.enabled = true;
        config.collab.server_url = "http://not-a-socket".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("server_url"))
        ));
    }

    #[test]
    fn bad_server_url_ignored_when_collab_disabled() {
        let mut config = PlexoConfig::default();
        config.collab.enabled = false;
        config.collab.server_url = "http://not-a-socket".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn invalid_bind_address_fails() {
        let mut config = PlexoConfig::default();
        config.relay.bind_address = "not valid!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("bind_address"))
        ));
    }
}
