// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads against the library read-model tables (`users`, `reservations`,
//! `borrows`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use libris_core::time::format_timestamp;
use libris_core::{DueBorrow, LibrisError, User, UserId};
use rusqlite::{Row, params};

use super::row::{parsed, timestamp};
use crate::database::Database;

/// Resolve many users in one statement. Unknown ids are absent from the map.
pub async fn users_by_id(
    db: &Database,
    ids: &[UserId],
) -> Result<HashMap<UserId, User>, LibrisError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids = serde_json::to_string(ids).map_err(LibrisError::storage)?;

    db.connection()
        .call(move |conn| -> Result<HashMap<UserId, User>, rusqlite::Error> {
            let mut stmt = conn.prepare_cached(
                "SELECT user_id, created_at FROM users \
                 WHERE user_id IN (SELECT value FROM json_each(?1))",
            )?;
            let rows = stmt.query_map(params![ids], |row| {
                Ok(User {
                    id: parsed(row, 0)?,
                    created_at: timestamp(row, 1)?,
                })
            })?;
            rows.map(|user| user.map(|u| (u.id, u))).collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct holders of pending reservations for a book, oldest reservation first.
pub async fn pending_reservation_holders(
    db: &Database,
    book_id: &str,
) -> Result<Vec<UserId>, LibrisError> {
    let book_id = book_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<UserId>, rusqlite::Error> {
            let mut stmt = conn.prepare_cached(
                "SELECT user_id FROM reservations \
                 WHERE book_id = ?1 AND status = 'pending' \
                 GROUP BY user_id ORDER BY MIN(created_at), user_id",
            )?;
            let rows = stmt.query_map(params![book_id], |row| parsed(row, 0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn due_borrow_from_row(row: &Row<'_>) -> rusqlite::Result<DueBorrow> {
    Ok(DueBorrow {
        borrow_id: row.get(0)?,
        user_id: parsed(row, 1)?,
        book_title: row.get(2)?,
        due_at: timestamp(row, 3)?,
    })
}

/// Unreturned borrows with `after < due_at <= until`, soonest first.
///
/// `after = None` means no lower bound.
pub async fn unreturned_borrows_due(
    db: &Database,
    after: Option<DateTime<Utc>>,
    until: DateTime<Utc>,
) -> Result<Vec<DueBorrow>, LibrisError> {
    let after = after.map(|t| format_timestamp(&t));
    let until = format_timestamp(&until);
    db.connection()
        .call(move |conn| -> Result<Vec<DueBorrow>, rusqlite::Error> {
            let mut stmt = conn.prepare_cached(
                "SELECT borrow_id, user_id, book_title, due_at FROM borrows \
                 WHERE returned_at IS NULL \
                   AND (?1 IS NULL OR due_at > ?1) AND due_at <= ?2 \
                 ORDER BY due_at, borrow_id",
            )?;
            let rows = stmt.query_map(params![after, until], due_borrow_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
