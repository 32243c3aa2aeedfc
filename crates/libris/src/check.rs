// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `libris check` and `libris migrate` command implementations.
//!
//! `check` validates the loaded configuration and opens (migrating if
//! needed) the database, printing one line per check. `migrate` only opens
//! the database so pending migrations are applied.

use std::time::{Duration, Instant};

use libris_config::model::LibrisConfig;
use libris_core::{EventStore, HealthStatus, LibrisError, PluginAdapter};
use libris_storage::SqliteStorage;
use tracing::info;

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `libris check` command. Returns `false` if any check failed.
pub async fn run_check(config: &LibrisConfig) -> bool {
    let results = vec![
        check_config(config),
        check_gateway(config),
        check_database(config).await,
    ];

    println!();
    println!("  libris check");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => {
                warn_count += 1;
                "[WARN]"
            }
            CheckStatus::Fail => {
                fail_count += 1;
                "[FAIL]"
            }
        };
        println!(
            "    {tag} {:<14} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    fail_count == 0
}

/// Run the `libris migrate` command.
pub async fn run_migrate(config: &LibrisConfig) -> Result<(), LibrisError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage.shutdown().await?;
    info!(path = %config.storage.database_path, "migrations applied");
    println!("database up to date: {}", config.storage.database_path);
    Ok(())
}

fn check_config(config: &LibrisConfig) -> CheckResult {
    let start = Instant::now();
    let message = format!(
        "valid (fan-out concurrency {}, retries {})",
        config.fanout.max_concurrency, config.fanout.max_retries
    );
    CheckResult::new("Configuration", CheckStatus::Pass, message, start)
}

fn check_gateway(config: &LibrisConfig) -> CheckResult {
    let start = Instant::now();
    let gateway = &config.gateway;
    if !gateway.enabled {
        return CheckResult::new("Gateway", CheckStatus::Pass, "disabled", start);
    }
    match gateway.bearer_token {
        Some(_) => CheckResult::new(
            "Gateway",
            CheckStatus::Pass,
            format!("{}:{}", gateway.host, gateway.port),
            start,
        ),
        None => CheckResult::new(
            "Gateway",
            CheckStatus::Warn,
            "no bearer token configured, all requests will be rejected",
            start,
        ),
    }
}

async fn check_database(config: &LibrisConfig) -> CheckResult {
    let start = Instant::now();
    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }

    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Database",
            CheckStatus::Pass,
            format!("ready ({})", config.storage.database_path),
            start,
        ),
        Ok(HealthStatus::Degraded(msg)) => {
            CheckResult::new("Database", CheckStatus::Warn, msg, start)
        }
        Ok(HealthStatus::Unhealthy(msg)) => {
            CheckResult::new("Database", CheckStatus::Fail, msg, start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    };
    let _ = storage.shutdown().await;
    result
}
