// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Plexo service bridge.

use thiserror::Error;

/// The primary error type used across all Plexo crates.
#[derive(Debug, Error)]
pub enum PlexoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Service registry errors (registration, lifecycle failures).
    #[error("service error for `{service}`: {message}")]
    Registry { service: String, message: String },

    /// A dependency cycle was detected during initialization ordering.
    /// Fatal: aborts the whole initialization pass.
    #[error("dependency cycle detected involving service `{service}`")]
    DependencyCycle { service: String },

    /// A named service was requested but never registered.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// A module id does not resolve to a registered manifest.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// A connection endpoint does not resolve to a known module instance.
    #[error("unknown module instance: {0}")]
    UnknownInstance(String),

    /// A module instance attempted to connect to itself.
    #[error("self-connection rejected for instance {0}")]
    SelfConnection(String),

    /// Message content failed validation against a declared schema.
    #[error("schema `{schema}` validation failed: {message}")]
    Validation { schema: String, message: String },

    /// State persistence errors (database open, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Collaboration connection errors (socket failure, send on closed connection).
    #[error("connection error: {message}")]
    Connection {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
