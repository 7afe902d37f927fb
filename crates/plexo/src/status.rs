// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `status` subcommand: configuration summary and persisted snapshot
//! inspection.

use plexo_config::model::StateBackend;
use plexo_config::PlexoConfig;
use plexo_core::PlexoError;
use plexo_state::{SqliteStore, StateStore};

/// Print a human-readable status summary.
pub async fn run(config: PlexoConfig) -> Result<(), PlexoError> {
    println!("bridge:   {}", config.bridge.name);
    println!(
        "relay:    ws://{}:{}",
        config.relay.bind_address, config.relay.port
    );
    println!(
        "collab:   {}",
        if config.collab.enabled {
            config.collab.server_url.as_str()
        } else {
            "disabled"
        }
    );

    match config.state.backend {
        StateBackend::Memory => println!("state:    in-memory (no persistence)"),
        StateBackend::Sqlite => {
            println!("state:    sqlite at {}", config.state.database_path);
            if !std::path::Path::new(&config.state.database_path).exists() {
                println!("snapshot: none (database not created yet)");
                return Ok(());
            }

            let store = SqliteStore::open(&config.state.database_path).await?;
            match store.load(&config.state.storage_key).await? {
                None => println!("snapshot: none persisted under `{}`", config.state.storage_key),
                Some(snapshot) => {
                    println!(
                        "snapshot: v{} at {} ({} module, {} page, {} global entries)",
                        snapshot.version,
                        snapshot.timestamp,
                        snapshot.module_states.len(),
                        snapshot.page_states.len(),
                        snapshot.global_state.len(),
                    );
                }
            }
            store.close().await?;
        }
    }

    Ok(())
}
