// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, sane limits and bounded backoff parameters.

use crate::diagnostic::ConfigError;
use crate::model::LibrisConfig;

/// Hard ceiling on the reader page size.
pub const READER_LIMIT_CEILING: usize = 100;

/// Longest dedup claim a fan-out may hold (one week).
pub const DEDUP_TTL_CEILING_SECS: u64 = 7 * 24 * 3600;

/// Longest due-soon reminder horizon (one year).
pub const DUE_SOON_HORIZON_CEILING_HOURS: u64 = 365 * 24;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LibrisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.name.trim().is_empty() {
        fail("service.name must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if let Some(token) = &config.gateway.bearer_token {
        if token.trim().is_empty() {
            fail("gateway.bearer_token must not be blank when set".to_string());
        }
    }

    if config.publisher.timeout_ms == 0 {
        fail("publisher.timeout_ms must be greater than 0".to_string());
    }

    if config.publisher.max_metadata_bytes < 2 {
        fail(format!(
            "publisher.max_metadata_bytes must be at least 2, got {}",
            config.publisher.max_metadata_bytes
        ));
    }

    let fanout = &config.fanout;
    if fanout.max_concurrency < 1 {
        fail("fanout.max_concurrency must be at least 1".to_string());
    }
    if fanout.backoff_factor.is_nan() || fanout.backoff_factor < 1.0 {
        fail(format!(
            "fanout.backoff_factor must be at least 1.0, got {}",
            fanout.backoff_factor
        ));
    }
    if !(0.0..1.0).contains(&fanout.jitter) {
        fail(format!(
            "fanout.jitter must be in [0, 1), got {}",
            fanout.jitter
        ));
    }
    if fanout.timeout_secs == 0 {
        fail("fanout.timeout_secs must be greater than 0".to_string());
    }
    if fanout.dedup_ttl_secs > DEDUP_TTL_CEILING_SECS {
        fail(format!(
            "fanout.dedup_ttl_secs must be at most {DEDUP_TTL_CEILING_SECS}, got {}",
            fanout.dedup_ttl_secs
        ));
    }

    let reader = &config.reader;
    if reader.timeout_ms == 0 {
        fail("reader.timeout_ms must be greater than 0".to_string());
    }
    if reader.max_limit > READER_LIMIT_CEILING {
        fail(format!(
            "reader.max_limit must be at most {READER_LIMIT_CEILING}, got {}",
            reader.max_limit
        ));
    }
    if reader.default_limit < 1 || reader.default_limit > reader.max_limit {
        fail(format!(
            "reader.default_limit must be in [1, reader.max_limit], got {}",
            reader.default_limit
        ));
    }

    if config.reminders.enabled && config.reminders.interval_secs == 0 {
        fail("reminders.interval_secs must be greater than 0".to_string());
    }
    if config.reminders.due_soon_horizon_hours > DUE_SOON_HORIZON_CEILING_HOURS {
        fail(format!(
            "reminders.due_soon_horizon_hours must be at most {DUE_SOON_HORIZON_CEILING_HOURS}, got {}",
            config.reminders.due_soon_horizon_hours
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &LibrisConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        let config = LibrisConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = LibrisConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = LibrisConfig::default();
        config.fanout.max_concurrency = 0;
        config.fanout.jitter = 1.5;
        config.reader.default_limit = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3, "{msgs:?}");
    }

    #[test]
    fn backoff_factor_below_one_fails() {
        let mut config = LibrisConfig::default();
        config.fanout.backoff_factor = 0.5;
        assert!(messages(&config)[0].contains("backoff_factor"));
    }

    #[test]
    fn nan_backoff_factor_fails() {
        let mut config = LibrisConfig::default();
        config.fanout.backoff_factor = f64::NAN;
        assert!(messages(&config)[0].contains("backoff_factor"));
    }

    #[test]
    fn reader_limits_are_bounded() {
        let mut config = LibrisConfig::default();
        config.reader.max_limit = 500;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("reader.max_limit")));

        let mut config = LibrisConfig::default();
        config.reader.default_limit = 80;
        config.reader.max_limit = 60;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("reader.default_limit")));
    }

    #[test]
    fn blank_bearer_token_fails() {
        let mut config = LibrisConfig::default();
        config.gateway.bearer_token = Some("   ".into());
        assert!(messages(&config)[0].contains("bearer_token"));
    }

    #[test]
    fn zero_reminder_interval_only_matters_when_enabled() {
        let mut config = LibrisConfig::default();
        config.reminders.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
        config.reminders.enabled = true;
        assert!(messages(&config)[0].contains("interval_secs"));
    }

    #[test]
    fn oversized_durations_fail() {
        let mut config = LibrisConfig::default();
        config.fanout.dedup_ttl_secs = u64::MAX;
        config.reminders.due_soon_horizon_hours = u64::MAX;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("fanout.dedup_ttl_secs")));
        assert!(msgs.iter().any(|m| m.contains("reminders.due_soon_horizon_hours")));
        assert_eq!(
            config.reminders.due_soon_horizon(),
            std::time::Duration::from_secs(u64::MAX)
        );
    }
}
