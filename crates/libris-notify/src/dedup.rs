// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived claims that keep a repeated trigger from notifying twice.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Expiry used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// In-process set of claimed dedup keys, each with an expiry.
///
/// Expired entries are evicted whenever the set is touched.
#[derive(Debug, Default)]
pub struct TriggerDedup {
    entries: Mutex<HashMap<String, Instant>>,
}

impl TriggerDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for `ttl`. Returns `false` if a live claim already exists.
    pub fn claim(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expires| *expires > now);
        if entries.contains_key(key) {
            return false;
        }
        let expires = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        entries.insert(key.to_string(), expires);
        true
    }

    /// Drop a claim so the key may be retried immediately.
    pub fn release(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of live claims.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expires| *expires > now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
