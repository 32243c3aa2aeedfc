// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event store writes and lookups.

use libris_core::time::format_timestamp;
use libris_core::{Event, EventId, LibrisError, UserId};
use rusqlite::{OptionalExtension, params};

use super::row::{event_columns, event_from_row};
use crate::database::Database;

/// Insert an event and its initial recipient rows in one transaction.
///
/// Recipient rows are upserted on `(user_id, event_id)` with `DO NOTHING`, so
/// a retried insert of the same recipients leaves existing rows unchanged.
pub async fn insert_event(
    db: &Database,
    event: &Event,
    recipients: &[UserId],
) -> Result<(), LibrisError> {
    let event_id = event.event_id.to_string();
    let event_type = event.event_type.to_string();
    let title = event.title.clone();
    let message = event.message.clone();
    let object_kind = event.object_ref.as_ref().map(|r| r.kind.to_string());
    let object_id = event.object_ref.as_ref().map(|r| r.id.clone());
    let object_title = event.object_title.clone();
    let metadata = event.metadata.as_ref().map(|m| m.get().to_string());
    let is_broadcast = event.is_broadcast;
    let created_at = format_timestamp(&event.created_at);
    let recipients: Vec<String> = recipients.iter().map(UserId::to_string).collect();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO events (event_id, event_type, title, message, object_kind, \
                 object_id, object_title, metadata, is_broadcast, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event_id,
                    event_type,
                    title,
                    message,
                    object_kind,
                    object_id,
                    object_title,
                    metadata,
                    is_broadcast,
                    created_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO recipient_status (user_id, event_id, is_read, read_at, created_at) \
                     VALUES (?1, ?2, 0, NULL, ?3) \
                     ON CONFLICT (user_id, event_id) DO NOTHING",
                )?;
                for user_id in &recipients {
                    stmt.execute(params![user_id, event_id, created_at])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one event by id.
pub async fn get_event(db: &Database, event_id: EventId) -> Result<Option<Event>, LibrisError> {
    let event_id = event_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Event>, rusqlite::Error> {
            conn.query_row(
                concat!("SELECT ", event_columns!(), " FROM events e WHERE e.event_id = ?1"),
                params![event_id],
                event_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of events in the store.
#[cfg(test)]
async fn count_events(db: &Database) -> Result<u64, LibrisError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(crate::database::map_tr_err)
}
