// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted snapshot format.
//!
//! The on-disk shape is a single JSON blob per storage key:
//! `{version, timestamp, moduleStates, pageStates, globalState}`. The
//! explicit version field allows migration of old snapshots; snapshots
//! written before versioning existed deserialize as version 0 and are
//! accepted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A full point-in-time copy of all three state tiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Format version; absent in legacy snapshots.
    #[serde(default)]
    pub version: u32,
    /// RFC 3339 time the snapshot was taken.
    #[serde(default)]
    pub timestamp: String,
    /// Module-scoped state, keyed by module instance id.
    #[serde(default)]
    pub module_states: HashMap<String, Value>,
    /// Page-scoped state, keyed by page id.
    #[serde(default)]
    pub page_states: HashMap<String, Value>,
    /// Global state, keyed by arbitrary string.
    #[serde(default)]
    pub global_state: HashMap<String, Value>,
}

impl StateSnapshot {
    /// Create an empty snapshot stamped with the current version and time.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().to_rfc3339(),
            ..Self::default()
        }
    }

    /// True when the snapshot was written by a newer format than this build
    /// understands.
    pub fn is_from_future(&self) -> bool {
        self.version > SNAPSHOT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_keys() {
        let mut snapshot = StateSnapshot::empty();
        snapshot
            .module_states
            .insert("m1".to_string(), json!({"x": 1}));

        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("moduleStates").is_some());
        assert!(value.get("pageStates").is_some());
        assert!(value.get("globalState").is_some());
        assert_eq!(value["version"], SNAPSHOT_VERSION);
    }

    #[test]
    fn legacy_snapshot_without_version_is_version_zero() {
        let legacy = r#"{
            "timestamp": "2024-06-01T00:00:00Z",
            "moduleStates": {"m1": {"x": 1}},
            "pageStates": {},
            "globalState": {"theme": "dark"}
        }"#;
        let snapshot: StateSnapshot = serde_json::from_str(legacy).unwrap();
        assert_eq!(snapshot.version, 0);
        assert!(!snapshot.is_from_future());
        assert_eq!(snapshot.module_states["m1"], json!({"x": 1}));
        assert_eq!(snapshot.global_state["theme"], "dark");
    }

    #[test]
    fn future_version_is_detected() {
        let future = format!(r#"{{"version": {}}}"#, SNAPSHOT_VERSION + 1);
        let snapshot: StateSnapshot = serde_json::from_str(&future).unwrap();
        assert!(snapshot.is_from_future());
    }

    #[test]
    fn roundtrips_through_json() {
        let mut snapshot = StateSnapshot::empty();
        snapshot.page_states.insert("p1".to_string(), json!([1, 2]));
        let text = serde_json::to_string(&snapshot).unwrap();
        let back: StateSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.page_states["p1"], json!([1, 2]));
        assert_eq!(back.version, snapshot.version);
    }
}
