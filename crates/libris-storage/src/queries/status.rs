// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient status transitions.
//!
//! Rows only ever move from unread to read. `read_at` is written as
//! `MAX(now, created_at)` so it never precedes the row's creation.

use chrono::{DateTime, Utc};
use libris_core::time::format_timestamp;
use libris_core::{EventId, LibrisError, RecipientStatus, UserId};
use rusqlite::{OptionalExtension, Row, named_params, params};

use super::row::{opt_timestamp, parsed, timestamp};
use crate::database::Database;

enum MarkOutcome {
    Missing,
    NotVisible,
    Marked { changed: bool },
}

/// Mark one event read for a user.
///
/// Targeted events require an existing status row; broadcast rows are
/// materialized on first mark.
pub async fn mark_read(
    db: &Database,
    user_id: UserId,
    event_id: EventId,
    now: DateTime<Utc>,
) -> Result<bool, LibrisError> {
    let user = user_id.to_string();
    let event = event_id.to_string();
    let now = format_timestamp(&now);

    let outcome = db
        .connection()
        .call(move |conn| -> Result<MarkOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let is_broadcast: Option<bool> = tx
                .query_row(
                    "SELECT is_broadcast FROM events WHERE event_id = ?1",
                    params![event],
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = match is_broadcast {
                None => MarkOutcome::Missing,
                Some(true) => {
                    let changed = tx.execute(
                        "INSERT INTO recipient_status (user_id, event_id, is_read, read_at, created_at) \
                         VALUES (?1, ?2, 1, ?3, ?3) \
                         ON CONFLICT (user_id, event_id) DO UPDATE \
                         SET is_read = 1, read_at = MAX(excluded.read_at, recipient_status.created_at) \
                         WHERE recipient_status.is_read = 0",
                        params![user, event, now],
                    )?;
                    MarkOutcome::Marked {
                        changed: changed == 1,
                    }
                }
                Some(false) => {
                    let changed = tx.execute(
                        "UPDATE recipient_status SET is_read = 1, read_at = MAX(?3, created_at) \
                         WHERE user_id = ?1 AND event_id = ?2 AND is_read = 0",
                        params![user, event, now],
                    )?;
                    if changed == 1 {
                        MarkOutcome::Marked { changed: true }
                    } else {
                        let exists: bool = tx.query_row(
                            "SELECT EXISTS (SELECT 1 FROM recipient_status \
                             WHERE user_id = ?1 AND event_id = ?2)",
                            params![user, event],
                            |row| row.get(0),
                        )?;
                        if exists {
                            MarkOutcome::Marked { changed: false }
                        } else {
                            MarkOutcome::NotVisible
                        }
                    }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        MarkOutcome::Missing => Err(LibrisError::EventNotFound(event_id)),
        MarkOutcome::NotVisible => Err(LibrisError::NotVisible(event_id)),
        MarkOutcome::Marked { changed } => Ok(changed),
    }
}

/// Mark every unread item of the user's feed read. Returns the number of
/// items that transitioned.
///
/// Runs as one transaction: existing unread rows are updated, then a read
/// row is inserted for each visible broadcast the user never touched.
pub async fn mark_all_read(
    db: &Database,
    user_id: UserId,
    visible_since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, LibrisError> {
    let user = user_id.to_string();
    let visible_since = format_timestamp(&visible_since);
    let now = format_timestamp(&now);

    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE recipient_status SET is_read = 1, read_at = MAX(:now, created_at) \
                 WHERE user_id = :user_id AND is_read = 0 \
                   AND event_id IN (SELECT event_id FROM events \
                                    WHERE is_broadcast = 0 OR created_at >= :visible_since)",
                named_params! {
                    ":user_id": user,
                    ":visible_since": visible_since,
                    ":now": now,
                },
            )?;
            let inserted = tx.execute(
                "INSERT INTO recipient_status (user_id, event_id, is_read, read_at, created_at) \
                 SELECT :user_id, e.event_id, 1, :now, :now FROM events e \
                 WHERE e.is_broadcast = 1 AND e.created_at >= :visible_since \
                   AND NOT EXISTS (SELECT 1 FROM recipient_status rs \
                                   WHERE rs.user_id = :user_id AND rs.event_id = e.event_id) \
                 ON CONFLICT (user_id, event_id) DO NOTHING",
                named_params! {
                    ":user_id": user,
                    ":visible_since": visible_since,
                    ":now": now,
                },
            )?;
            tx.commit()?;
            Ok((updated + inserted) as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<RecipientStatus> {
    Ok(RecipientStatus {
        user_id: parsed(row, 0)?,
        event_id: parsed(row, 1)?,
        is_read: row.get(2)?,
        read_at: opt_timestamp(row, 3)?,
        created_at: timestamp(row, 4)?,
    })
}

/// Status row of one `(user, event)` pair.
pub async fn recipient_status(
    db: &Database,
    user_id: UserId,
    event_id: EventId,
) -> Result<Option<RecipientStatus>, LibrisError> {
    let user = user_id.to_string();
    let event = event_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<RecipientStatus>, rusqlite::Error> {
            conn.query_row(
                "SELECT user_id, event_id, is_read, read_at, created_at FROM recipient_status \
                 WHERE user_id = ?1 AND event_id = ?2",
                params![user, event],
                status_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All status rows of an event, ordered by user id.
pub async fn recipients_of(
    db: &Database,
    event_id: EventId,
) -> Result<Vec<RecipientStatus>, LibrisError> {
    let event = event_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<RecipientStatus>, rusqlite::Error> {
            let mut stmt = conn.prepare_cached(
                "SELECT user_id, event_id, is_read, read_at, created_at FROM recipient_status \
                 WHERE event_id = ?1 ORDER BY user_id",
            )?;
            let rows = stmt.query_map(params![event], status_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
