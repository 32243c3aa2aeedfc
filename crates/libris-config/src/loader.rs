// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./libris.toml` > `~/.config/libris/libris.toml` > `/etc/libris/libris.toml`
//! with environment variable overrides via `LIBRIS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LibrisConfig;

/// Config file name searched in every layer.
pub const CONFIG_FILE_NAME: &str = "libris.toml";

/// System-wide config location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/libris/libris.toml";

/// Sections addressable from `LIBRIS_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "gateway",
    "publisher",
    "fanout",
    "reader",
    "reminders",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/libris/libris.toml` (system-wide)
/// 3. `~/.config/libris/libris.toml` (user XDG config)
/// 4. `./libris.toml` (local directory)
/// 5. `LIBRIS_*` environment variables
pub fn load_config() -> Result<LibrisConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LibrisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LibrisConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LibrisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LibrisConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LibrisConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("libris").join(CONFIG_FILE_NAME))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `LIBRIS_GATEWAY_BEARER_TOKEN`
/// must map to `gateway.bearer_token`, not `gateway.bearer.token`.
pub fn env_provider() -> Env {
    Env::prefixed("LIBRIS_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key onto its dotted config path.
///
/// Only the first underscore after a known section name becomes a dot.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
        assert_eq!(map_env_key("fanout_max_concurrency"), "fanout.max_concurrency");
        assert_eq!(
            map_env_key("reminders_due_soon_horizon_hours"),
            "reminders.due_soon_horizon_hours"
        );
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("agent_name"), "agent_name");
        assert_eq!(map_env_key("storage"), "storage");
    }
}
