// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for the event log and per-recipient read state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LibrisError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Event, EventId, FeedItem, FeedQuery, RecipientStatus, UserId};

/// Event store plus recipient status store.
///
/// Implementations must make every method atomic: a failed call leaves no
/// partial state behind. Events are never updated or deleted.
#[async_trait]
pub trait EventStore: PluginAdapter {
    /// Opens the backend (connections, migrations).
    async fn initialize(&self) -> Result<(), LibrisError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), LibrisError>;

    /// Insert an event and, in the same transaction, an unread status row for
    /// each recipient. Existing `(user, event)` rows are left untouched.
    async fn insert_event(&self, event: &Event, recipients: &[UserId])
    -> Result<(), LibrisError>;

    /// Fetch a single event.
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, LibrisError>;

    /// One page of a user's feed, newest first, with the derived read flag.
    ///
    /// Returns at most `query.limit` items.
    async fn feed_page(&self, query: &FeedQuery) -> Result<Vec<FeedItem>, LibrisError>;

    /// Number of feed items the user has not read.
    async fn unread_count(
        &self,
        user_id: UserId,
        visible_since: DateTime<Utc>,
    ) -> Result<u64, LibrisError>;

    /// Mark one event read for the user, creating the status row if needed.
    ///
    /// Returns `true` if the row transitioned to read. Fails with
    /// `EventNotFound` or `NotVisible`.
    async fn mark_read(
        &self,
        user_id: UserId,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<bool, LibrisError>;

    /// Mark every visible unread event read. Returns the number of transitions.
    async fn mark_all_read(
        &self,
        user_id: UserId,
        visible_since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, LibrisError>;

    /// Status row of a single `(user, event)` pair, if materialized.
    async fn recipient_status(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Option<RecipientStatus>, LibrisError>;

    /// All status rows of an event.
    async fn recipients_of(&self, event_id: EventId)
    -> Result<Vec<RecipientStatus>, LibrisError>;
}
