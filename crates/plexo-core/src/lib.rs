// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Plexo service bridge.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Plexo workspace: module manifests with
//! declared message schemas, the message envelope exchanged between module
//! instances, and the [`BridgeService`] trait all bridge services implement.

pub mod error;
pub mod manifest;
pub mod service;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PlexoError;
pub use manifest::{parse_module_manifest, ModuleManifest, ResolvedModule};
pub use service::{BridgeService, ServiceContext};
pub use types::{
    FieldSpec, FieldType, InstanceId, MessageDraft, MessageMetadata, MessageSchema, ModuleId,
    PageId, PluginMessage,
};
