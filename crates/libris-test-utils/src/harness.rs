// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full notification stack over a temp SQLite
//! database, an [`InMemoryDirectory`] and a [`ManualClock`], and can hand
//! out the HTTP router wired to the same services.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use libris_config::model::{LibrisConfig, StorageConfig};
use libris_core::{EventId, EventStore, FeedItem, LibrisError, PublishRequest, UserId};
use libris_gateway::{AuthConfig, GatewayState, build_router};
use libris_notify::{Dispatcher, Publisher, Reader};
use libris_resilience::{BackoffConfig, RetryPolicy};
use libris_storage::SqliteStorage;
use tokio_util::sync::CancellationToken;

use crate::clock::ManualClock;
use crate::directory::InMemoryDirectory;

/// Bearer token the harness configures on the gateway.
pub const TEST_BEARER_TOKEN: &str = "test-token";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: LibrisConfig,
    retry: RetryPolicy,
    clock_start: DateTime<Utc>,
    clock_step: chrono::Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = LibrisConfig::default();
        config.gateway.bearer_token = Some(TEST_BEARER_TOKEN.to_string());
        Self {
            config,
            // Short backoff keeps retry tests fast on a real clock.
            retry: RetryPolicy::new(BackoffConfig {
                base_delay: std::time::Duration::from_millis(1),
                ..BackoffConfig::default()
            }),
            clock_start: DateTime::from_timestamp(1_772_355_600, 0).unwrap_or_default(),
            clock_step: chrono::Duration::milliseconds(1),
        }
    }

    /// Adjust the configuration before services are built.
    pub fn with_config(mut self, f: impl FnOnce(&mut LibrisConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Replace the dispatcher's retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start the clock at `start`.
    pub fn with_clock_start(mut self, start: DateTime<Utc>) -> Self {
        self.clock_start = start;
        self
    }

    /// Advance the clock by `step` after every reading (zero freezes it).
    pub fn with_clock_step(mut self, step: chrono::Duration) -> Self {
        self.clock_step = step;
        self
    }

    /// Build the harness, creating a fresh temp database.
    pub async fn build(self) -> Result<TestHarness, LibrisError> {
        let temp_dir = tempfile::TempDir::new().map_err(LibrisError::storage)?;
        let db_path = temp_dir.path().join("libris-test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..config.storage
        };

        let store = Arc::new(SqliteStorage::new(config.storage.clone()));
        store.initialize().await?;

        let directory = Arc::new(InMemoryDirectory::new());
        let clock = Arc::new(ManualClock::ticking(self.clock_start, self.clock_step));

        let publisher = Arc::new(Publisher::new(
            store.clone(),
            directory.clone(),
            clock.clone(),
            config.publisher.clone(),
        ));
        let dispatcher = Arc::new(
            Dispatcher::new(
                publisher.clone(),
                directory.clone(),
                directory.clone(),
                clock.clone(),
                config.fanout.clone(),
            )
            .with_retry(self.retry),
        );
        let reader = Arc::new(Reader::new(
            store.clone(),
            directory.clone(),
            clock.clone(),
            config.reader.clone(),
        ));

        Ok(TestHarness {
            config,
            store,
            directory,
            clock,
            publisher,
            dispatcher,
            reader,
            shutdown: CancellationToken::new(),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over temp storage.
pub struct TestHarness {
    pub config: LibrisConfig,
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<SqliteStorage>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: Arc<ManualClock>,
    pub publisher: Arc<Publisher>,
    pub dispatcher: Arc<Dispatcher>,
    pub reader: Arc<Reader>,
    /// Parent token handed to every operation and to the router.
    pub shutdown: CancellationToken,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub async fn new() -> Result<Self, LibrisError> {
        Self::builder().build().await
    }

    /// Register a new user created at the current clock time.
    pub async fn add_user(&self) -> UserId {
        let id = UserId::new();
        self.directory.add_user(id, libris_core::Clock::now(&*self.clock)).await;
        id
    }

    /// Publish through the publisher with the harness token.
    pub async fn publish(&self, request: PublishRequest) -> Result<EventId, LibrisError> {
        self.publisher.publish(request, &self.shutdown).await
    }

    /// Walk every page of `user_id`'s feed.
    pub async fn feed_all(&self, user_id: UserId) -> Result<Vec<FeedItem>, LibrisError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .reader
                .list_feed(user_id, cursor.as_deref(), Some(100), &self.shutdown)
                .await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next.encode()),
                None => return Ok(items),
            }
        }
    }

    /// Shared state for the HTTP router.
    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            reader: self.reader.clone(),
            publisher: self.publisher.clone(),
            dispatcher: self.dispatcher.clone(),
            store: self.store.clone(),
            auth: AuthConfig {
                bearer_token: self.config.gateway.bearer_token.clone(),
            },
            shutdown: self.shutdown.clone(),
            start_time: std::time::Instant::now(),
        }
    }

    /// The HTTP router wired to this harness's services.
    pub fn router(&self) -> axum::Router {
        build_router(self.gateway_state())
    }
}
