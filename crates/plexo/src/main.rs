// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plexo - runtime service bridge for plugin-studio dashboards.
//!
//! This is the binary entry point for the Plexo bridge.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod serve;
mod status;

/// Plexo - runtime service bridge for plugin-studio dashboards.
#[derive(Parser, Debug)]
#[command(name = "plexo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bridge: relay server plus registered services.
    Serve,
    /// Print configuration and persisted snapshot summary.
    Status,
    /// Print the effective merged configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match plexo_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            plexo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.bridge.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Some(Commands::Serve) => serve::run(config).await,
        Some(Commands::Status) => status::run(config).await,
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(text) => {
                    println!("{text}");
                    Ok(())
                }
                Err(e) => Err(plexo_core::PlexoError::Internal(format!(
                    "failed to render config: {e}"
                ))),
            }
        }
        None => {
            println!("plexo: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("plexo: {e}");
        std::process::exit(1);
    }
}
