// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user feed and unread count.
//!
//! A user's feed is the union of targeted events that have a status row for
//! the user and broadcast events created at or after `visible_since`. Both
//! queries below share that definition through `visible_cte!` so the unread
//! count always equals the number of unread feed items.

use chrono::{DateTime, Utc};
use libris_core::time::format_timestamp;
use libris_core::{FeedItem, FeedQuery, LibrisError, UserId};
use rusqlite::named_params;

use super::row::{EVENT_COLUMN_COUNT, event_columns, event_from_row};
use crate::database::Database;

/// `visible(<event columns>, is_read)` for `:user_id` and `:visible_since`.
macro_rules! visible_cte {
    () => {
        concat!(
            "WITH visible AS (",
            " SELECT ",
            event_columns!(),
            ", rs.is_read AS is_read",
            " FROM recipient_status rs JOIN events e ON e.event_id = rs.event_id",
            " WHERE rs.user_id = :user_id AND e.is_broadcast = 0",
            " UNION ALL",
            " SELECT ",
            event_columns!(),
            ", COALESCE(rs.is_read, 0) AS is_read",
            " FROM events e LEFT JOIN recipient_status rs",
            "   ON rs.event_id = e.event_id AND rs.user_id = :user_id",
            " WHERE e.is_broadcast = 1 AND e.created_at >= :visible_since",
            ") "
        )
    };
}

/// One page of the feed, newest first, strictly after `query.before`.
pub async fn feed_page(db: &Database, query: &FeedQuery) -> Result<Vec<FeedItem>, LibrisError> {
    let user_id = query.user_id.to_string();
    let visible_since = format_timestamp(&query.visible_since);
    let before_ts = query.before.map(|c| format_timestamp(&c.created_at));
    let before_id = query.before.map(|c| c.event_id.to_string());
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| -> Result<Vec<FeedItem>, rusqlite::Error> {
            let mut stmt = conn.prepare_cached(concat!(
                visible_cte!(),
                "SELECT * FROM visible",
                " WHERE :before_ts IS NULL",
                "    OR created_at < :before_ts",
                "    OR (created_at = :before_ts AND event_id < :before_id)",
                " ORDER BY created_at DESC, event_id DESC",
                " LIMIT :limit"
            ))?;
            let rows = stmt.query_map(
                named_params! {
                    ":user_id": user_id,
                    ":visible_since": visible_since,
                    ":before_ts": before_ts,
                    ":before_id": before_id,
                    ":limit": limit,
                },
                |row| {
                    let event = event_from_row(row)?;
                    let is_read: bool = row.get(EVENT_COLUMN_COUNT)?;
                    Ok(FeedItem::from_event(event, is_read))
                },
            )?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of unread items in the user's feed.
pub async fn unread_count(
    db: &Database,
    user_id: UserId,
    visible_since: DateTime<Utc>,
) -> Result<u64, LibrisError> {
    let user_id = user_id.to_string();
    let visible_since = format_timestamp(&visible_since);

    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                concat!(visible_cte!(), "SELECT COUNT(*) FROM visible WHERE is_read = 0"),
                named_params! {
                    ":user_id": user_id,
                    ":visible_since": visible_since,
                },
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(crate::database::map_tr_err)
}
