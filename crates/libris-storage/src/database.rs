// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread: one closure runs at a time, so each query function is atomic with
//! respect to every other. Do NOT create additional Connection instances for
//! writes.

use std::path::Path;
use std::time::Duration;

use libris_config::model::StorageConfig;
use libris_core::LibrisError;
use tracing::{debug, info};

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Convert a tokio-rusqlite error into `LibrisError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LibrisError {
    LibrisError::storage(e)
}

/// Handle to the single SQLite connection.
///
/// Cloning is cheap and every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database described by `config`, apply
    /// PRAGMAs, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, LibrisError> {
        let path = config.database_path.as_str();
        let in_memory = path == IN_MEMORY;
        if !in_memory {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(LibrisError::storage)?;
                }
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(LibrisError::storage)?;
        let db = Self { conn };

        let wal = config.wal_mode && !in_memory;
        db.apply_pragmas(wal, Duration::from_millis(config.busy_timeout_ms))
            .await?;
        db.migrate().await?;

        info!(path, wal, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, LibrisError> {
        Self::open(&StorageConfig {
            database_path: IN_MEMORY.to_string(),
            wal_mode: false,
            busy_timeout_ms: 5000,
        })
        .await
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    async fn apply_pragmas(&self, wal: bool, busy_timeout: Duration) -> Result<(), LibrisError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal {
                    let mode: String = conn.pragma_update_and_check(
                        None,
                        "journal_mode",
                        "WAL",
                        |row| row.get(0),
                    )?;
                    debug!(journal_mode = %mode, "journal mode set");
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(busy_timeout)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn migrate(&self) -> Result<(), LibrisError> {
        self.conn
            .call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| LibrisError::storage(e))
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), LibrisError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
