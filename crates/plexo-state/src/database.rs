// SPDX-FileCopyrightText: 2026 Plexo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and embedded
//! migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread; the [`Database`] struct IS the single writer. Do NOT create
//! additional Connection instances for writes.

use plexo_core::PlexoError;
use tokio_rusqlite::Connection;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Convert a tokio-rusqlite error into a Plexo storage error.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error) -> PlexoError {
    PlexoError::Storage {
        source: Box::new(err),
    }
}

/// Handle to the state database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, enable WAL mode, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, PlexoError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PlexoError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| PlexoError::Storage {
                source: Box::new(e),
            })?;

        conn.call(
            |conn| -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                embedded::migrations::runner().run(conn)?;
                Ok(())
            },
        )
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(source) => PlexoError::Storage { source },
            other => PlexoError::Storage {
                source: other.to_string().into(),
            },
        })?;

        debug!(path = %path, "state database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), PlexoError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        // The migration table must exist after open.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'state_snapshots'",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/state.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let db = Database::open(path.to_str().unwrap()).await.unwrap();
            db.close().await.unwrap();
        }
        // Migrations already applied; second open must succeed.
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
