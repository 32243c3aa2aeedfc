// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Libris notification service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Libris configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LibrisConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Publisher limits.
    #[serde(default)]
    pub publisher: PublisherConfig,

    /// Fan-out dispatcher settings.
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Reader API settings.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Periodic borrow reminder sweep.
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name used in logs and the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "libris".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("libris").join("libris.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("libris.db"))
        .display()
        .to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Whether `serve` starts the HTTP listener.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret expected from the fronting auth layer. `None` rejects
    /// every authenticated request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

/// Publisher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    /// Upper bound on a single publish, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum serialized size of the metadata object.
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: usize,
}

impl PublisherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_op_timeout_ms(),
            max_metadata_bytes: default_max_metadata_bytes(),
        }
    }
}

fn default_op_timeout_ms() -> u64 {
    5000
}

fn default_max_metadata_bytes() -> usize {
    4096
}

/// Fan-out dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Maximum number of publishes in flight per fan-out.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retries per recipient after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Multiplier applied per retry.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Relative jitter applied to each delay, in `[0, 1)`.
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Overall deadline of one fan-out.
    #[serde(default = "default_fanout_timeout_secs")]
    pub timeout_secs: u64,

    /// How long a trigger key stays claimed.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

impl FanoutConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_secs)
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            jitter: default_jitter(),
            timeout_secs: default_fanout_timeout_secs(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

fn default_max_concurrency() -> usize {
    16
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    50
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.2
}

fn default_fanout_timeout_secs() -> u64 {
    30
}

fn default_dedup_ttl_secs() -> u64 {
    600
}

/// Reader API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReaderConfig {
    /// Upper bound on a single reader call, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Page size when the caller does not pass `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest page size a caller may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl ReaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_op_timeout_ms(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    50
}

fn default_max_limit() -> usize {
    100
}

/// Periodic borrow reminder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReminderConfig {
    /// Whether `serve` runs the reminder loop.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between sweeps.
    #[serde(default = "default_reminder_interval_secs")]
    pub interval_secs: u64,

    /// Borrows due within this many hours get a due-soon reminder.
    #[serde(default = "default_due_soon_horizon_hours")]
    pub due_soon_horizon_hours: u64,

    /// Also notify borrows that are already overdue.
    #[serde(default = "default_true")]
    pub overdue_enabled: bool,
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn due_soon_horizon(&self) -> Duration {
        Duration::from_secs(self.due_soon_horizon_hours.saturating_mul(3600))
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_reminder_interval_secs(),
            due_soon_horizon_hours: default_due_soon_horizon_hours(),
            overdue_enabled: true,
        }
    }
}

fn default_reminder_interval_secs() -> u64 {
    3600
}

fn default_due_soon_horizon_hours() -> u64 {
    24
}
