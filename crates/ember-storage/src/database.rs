// SPDX-FileCopyrightText: 2026 Ember Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! Each [`Database`] owns one `tokio-rusqlite` connection, i.e. one SQLite
//! connection on its own background thread. Several handles may point at the
//! same file; SQLite's write lock arbitrates between them.

use std::path::Path;

use ember_config::model::StorageConfig;
use ember_core::EmberError;
use tracing::debug;

use crate::engine_cipher::{self, KdfParams};
use crate::migrations;

/// Handle to the secrets database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open with default storage settings. Mostly for tests.
    pub async fn open(path: &str) -> Result<Self, EmberError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with_config(&config).await
    }

    /// Open (creating if needed) the database described by `config`, apply
    /// PRAGMAs, register the engine cipher functions and run migrations.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, EmberError> {
        let path = config.database_path.clone();
        if let Some(parent) = Path::new(&path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| EmberError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| EmberError::Storage {
                source: format!("failed to open {path}: {e}").into(),
            })?;

        let wal_mode = config.wal_mode;
        let busy_timeout_ms = config.busy_timeout_ms;
        let params = KdfParams::from(config);
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.pragma_update(None, "busy_timeout", busy_timeout_ms)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            engine_cipher::register_functions(conn, params)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path = %path, wal_mode, busy_timeout_ms, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), EmberError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert a `tokio-rusqlite` error into [`EmberError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> EmberError {
    EmberError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/ember.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert!(tables.iter().any(|t| t == "secrets"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pragmas_are_applied() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("p.db").to_str().unwrap().to_string(),
            busy_timeout_ms: 1234,
            ..StorageConfig::default()
        };
        let db = Database::open_with_config(&config).await.unwrap();

        let (mode, timeout): (String, i64) = db
            .connection()
            .call(|conn| -> Result<(String, i64), rusqlite::Error> {
                let mode = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let timeout = conn.query_row("PRAGMA busy_timeout", [], |row| row.get(0))?;
                Ok((mode, timeout))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(timeout, 1234);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("again.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
    }
}
