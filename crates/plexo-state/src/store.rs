// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pluggable snapshot persistence backends.
//!
//! The state manager persists through a [`StateStore`]: in-memory for
//! ephemeral deployments and tests, SQLite for durable state. Persistence
//! failures never take the manager down; callers log and continue with
//! in-memory state only.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use plexo_core::PlexoError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::snapshot::StateSnapshot;

/// A snapshot persistence backend.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Write the snapshot under the given storage key, replacing any
    /// previous snapshot.
    async fn save(&self, storage_key: &str, snapshot: &StateSnapshot) -> Result<(), PlexoError>;

    /// Read the last persisted snapshot, or `None` if never written.
    async fn load(&self, storage_key: &str) -> Result<Option<StateSnapshot>, PlexoError>;

    /// True when snapshots survive process restarts. Autosave timers are
    /// only worth running against persistent stores.
    fn is_persistent(&self) -> bool;
}

/// In-memory store: snapshots live only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, StateSnapshot>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, storage_key: &str, snapshot: &StateSnapshot) -> Result<(), PlexoError> {
        let mut snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        snapshots.insert(storage_key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, storage_key: &str) -> Result<Option<StateSnapshot>, PlexoError> {
        let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
        Ok(snapshots.get(storage_key).cloned())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// SQLite-backed store: one row per storage key in `state_snapshots`.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open (or create) the backing database at `path`.
    pub async fn open(path: &str) -> Result<Self, PlexoError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Checkpoint and release the connection.
    pub async fn close(&self) -> Result<(), PlexoError> {
        self.db.close().await
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn save(&self, storage_key: &str, snapshot: &StateSnapshot) -> Result<(), PlexoError> {
        let payload = serde_json::to_string(snapshot).map_err(|e| PlexoError::Storage {
            source: Box::new(e),
        })?;
        let storage_key = storage_key.to_string();
        let version = snapshot.version;
        let updated_at = snapshot.timestamp.clone();

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO state_snapshots (storage_key, version, payload, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(storage_key) DO UPDATE SET
                         version = excluded.version,
                         payload = excluded.payload,
                         updated_at = excluded.updated_at",
                    params![storage_key, version, payload, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn load(&self, storage_key: &str) -> Result<Option<StateSnapshot>, PlexoError> {
        let storage_key = storage_key.to_string();
        let payload: Option<String> = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT payload FROM state_snapshots WHERE storage_key = ?1")?;
                let mut rows = stmt.query(params![storage_key])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row.get(0)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(map_tr_err)?;

        match payload {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| PlexoError::Storage {
                    source: Box::new(e),
                }),
        }
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
