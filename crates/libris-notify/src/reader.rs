// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user feed, unread count, and read-state operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use libris_config::model::ReaderConfig;
use libris_core::{
    Clock, EventId, EventStore, FeedCursor, FeedPage, FeedQuery, LibrisError, MarkResult, UserId,
    UserStore,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ops::bounded;

/// Reader operations on behalf of an authenticated user.
pub struct Reader {
    store: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    config: ReaderConfig,
}

impl Reader {
    pub fn new(
        store: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: ReaderConfig,
    ) -> Self {
        Self {
            store,
            users,
            clock,
            config,
        }
    }

    /// One page of the user's feed, newest first.
    ///
    /// `limit` defaults to the configured page size and is capped at the
    /// configured maximum; zero is rejected.
    pub async fn list_feed(
        &self,
        user_id: UserId,
        cursor: Option<&str>,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<FeedPage, LibrisError> {
        let before = cursor.map(FeedCursor::decode).transpose()?;
        let limit = page_limit(&self.config, limit)?;

        bounded(self.config.timeout(), cancel, async {
            let visible_since = self.visible_since(user_id).await?;
            let query = FeedQuery {
                user_id,
                visible_since,
                before,
                limit: limit + 1,
            };
            let mut items = self.store.feed_page(&query).await?;

            let next_cursor = if items.len() > limit {
                items.truncate(limit);
                items.last().map(|item| item.cursor())
            } else {
                None
            };
            Ok(FeedPage { items, next_cursor })
        })
        .await
    }

    /// Number of feed items the user has not read.
    pub async fn unread_count(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<u64, LibrisError> {
        bounded(self.config.timeout(), cancel, async {
            let visible_since = self.visible_since(user_id).await?;
            self.store.unread_count(user_id, visible_since).await
        })
        .await
    }

    /// Mark one event read. Already-read events report `changed: false`.
    pub async fn mark_read(
        &self,
        user_id: UserId,
        event_id: EventId,
        cancel: &CancellationToken,
    ) -> Result<MarkResult, LibrisError> {
        bounded(self.config.timeout(), cancel, async {
            self.visible_since(user_id).await?;
            let changed = self
                .store
                .mark_read(user_id, event_id, self.clock.now())
                .await?;
            debug!(user_id = %user_id, event_id = %event_id, changed, "mark_read");
            Ok(MarkResult { changed })
        })
        .await
    }

    /// Mark everything currently visible as read. Returns the number of
    /// notifications that changed state.
    pub async fn mark_all_read(
        &self,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<u64, LibrisError> {
        bounded(self.config.timeout(), cancel, async {
            let visible_since = self.visible_since(user_id).await?;
            let changed = self
                .store
                .mark_all_read(user_id, visible_since, self.clock.now())
                .await?;
            debug!(user_id = %user_id, changed, "mark_all_read");
            Ok(changed)
        })
        .await
    }

    /// Account creation time, the lower bound on visible broadcasts.
    async fn visible_since(&self, user_id: UserId) -> Result<DateTime<Utc>, LibrisError> {
        let mut users = self.users.get_many(&[user_id]).await?;
        users
            .remove(&user_id)
            .map(|user| user.created_at)
            .ok_or(LibrisError::UnknownUser {
                user_ids: vec![user_id],
            })
    }
}

fn page_limit(config: &ReaderConfig, requested: Option<usize>) -> Result<usize, LibrisError> {
    match requested {
        None => Ok(config.default_limit.min(config.max_limit)),
        Some(0) => Err(LibrisError::Validation("limit must be at least 1".into())),
        Some(n) => Ok(n.min(config.max_limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        let config = ReaderConfig::default();
        assert_eq!(page_limit(&config, None).unwrap(), 50);
        assert_eq!(page_limit(&config, Some(7)).unwrap(), 7);
        assert_eq!(page_limit(&config, Some(500)).unwrap(), 100);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = page_limit(&ReaderConfig::default(), Some(0)).unwrap_err();
        assert!(matches!(err, LibrisError::Validation(_)));
    }
}
