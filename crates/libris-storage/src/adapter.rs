// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the EventStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use libris_config::model::StorageConfig;
use libris_core::{
    Event, EventId, EventStore, FeedItem, FeedQuery, HealthStatus, LibrisError, PluginAdapter,
    RecipientStatus, UserId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed event store and recipient status store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`EventStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`EventStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the underlying Database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, LibrisError> {
        self.db.get().ok_or_else(|| LibrisError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, LibrisError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LibrisError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), LibrisError> {
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| LibrisError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LibrisError> {
        self.database()?.checkpoint().await
    }

    async fn insert_event(&self, event: &Event, recipients: &[UserId]) -> Result<(), LibrisError> {
        queries::events::insert_event(self.database()?, event, recipients).await
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, LibrisError> {
        queries::events::get_event(self.database()?, event_id).await
    }

    async fn feed_page(&self, query: &FeedQuery) -> Result<Vec<FeedItem>, LibrisError> {
        queries::feed::feed_page(self.database()?, query).await
    }

    async fn unread_count(
        &self,
        user_id: UserId,
        visible_since: DateTime<Utc>,
    ) -> Result<u64, LibrisError> {
        queries::feed::unread_count(self.database()?, user_id, visible_since).await
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<bool, LibrisError> {
        queries::status::mark_read(self.database()?, user_id, event_id, now).await
    }

    async fn mark_all_read(
        &self,
        user_id: UserId,
        visible_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, LibrisError> {
        queries::status::mark_all_read(self.database()?, user_id, visible_since, now).await
    }

    async fn recipient_status(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<RecipientStatus>, LibrisError> {
        queries::status::recipient_status(self.database()?, user_id, event_id).await
    }

    async fn recipients_of(&self, event_id: EventId) -> Result<Vec<RecipientStatus>, LibrisError> {
        queries::status::recipients_of(self.database()?, event_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config(crate::database::IN_MEMORY));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        let result = storage.initialize().await;
        assert!(result.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_reflects_initialization() {
        let storage = SqliteStorage::new(make_config(crate::database::IN_MEMORY));
        assert!(!storage.health_check().await.unwrap().is_healthy());

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn queries_fail_before_initialize() {
        let storage = SqliteStorage::new(make_config(crate::database::IN_MEMORY));
        let err = storage.get_event(EventId::new()).await.unwrap_err();
        assert!(matches!(err, LibrisError::Storage { .. }));
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}
