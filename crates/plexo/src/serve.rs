// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: the application composition root.
//!
//! Builds the registry, registers the built-in services, initializes them in
//! dependency order, runs the relay server until ctrl-c, and cleans up in
//! reverse order. Context and registry are constructed here and passed down;
//! nothing lives in module-level globals.

use std::sync::Arc;

use plexo_bus::BusService;
use plexo_collab::CollaborationService;
use plexo_config::PlexoConfig;
use plexo_core::{BridgeService, PlexoError, ServiceContext};
use plexo_registry::ServiceRegistry;
use plexo_state::StateService;
use serde_json::json;
use tracing::{info, warn};

/// Run the bridge until interrupted.
pub async fn run(config: PlexoConfig) -> Result<(), PlexoError> {
    info!(name = %config.bridge.name, "starting bridge");

    let registry = Arc::new(ServiceRegistry::new());

    let bus: Arc<dyn BridgeService> = Arc::new(BusService::new(
        config.bridge.message_history_cap,
        config.bridge.modules_dir.as_ref().map(Into::into),
    ));
    registry.register(bus);

    let state: Arc<dyn BridgeService> =
        Arc::new(StateService::from_config(&config.state).await?);
    registry.register(state);

    if config.collab.enabled {
        let collab: Arc<dyn BridgeService> =
            Arc::new(CollaborationService::new(config.collab.clone()));
        registry.register(collab);
    }

    let ctx = ServiceContext::new()
        .with_value("bridge.name", json!(config.bridge.name))
        .with_value("state.storage_key", json!(config.state.storage_key))
        .with_value("collab.server_url", json!(config.collab.server_url));

    let failed = registry.initialize_all(&ctx).await?;
    if !failed.is_empty() {
        // Per-service failures degrade that capability; the bridge stays up.
        warn!(failed = ?failed, "some services failed to initialize");
    }

    tokio::select! {
        result = plexo_relay::start_server(&config.relay) => {
            if let Err(e) = &result {
                warn!(error = %e, "relay server stopped");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    registry.cleanup_all().await?;
    info!("bridge stopped");
    Ok(())
}
