// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Column decoding shared by the query modules.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use libris_core::time::parse_timestamp;
use libris_core::{Event, ObjectKind, ObjectRef};
use rusqlite::Row;
use rusqlite::types::Type;
use serde_json::value::RawValue;

/// Event columns in the order [`event_from_row`] expects, qualified with `e.`.
macro_rules! event_columns {
    () => {
        "e.event_id, e.event_type, e.title, e.message, e.object_kind, e.object_id, \
         e.object_title, e.metadata, e.is_broadcast, e.created_at"
    };
}
pub(crate) use event_columns;

/// Number of columns produced by `event_columns!`.
pub(crate) const EVENT_COLUMN_COUNT: usize = 10;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Read a text column and parse it with `FromStr`.
pub(crate) fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn opt_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_timestamp(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Decode an event from the columns listed by `event_columns!`, starting at 0.
pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let object_kind: Option<String> = row.get(4)?;
    let object_id: Option<String> = row.get(5)?;
    let object_ref = match (object_kind, object_id) {
        (Some(kind), Some(id)) => Some(ObjectRef {
            kind: ObjectKind::from_str(&kind).map_err(|e| conversion_error(4, e))?,
            id,
        }),
        _ => None,
    };

    let metadata: Option<String> = row.get(7)?;
    let metadata = metadata
        .map(|m| RawValue::from_string(m).map_err(|e| conversion_error(7, e)))
        .transpose()?;

    Ok(Event {
        event_id: parsed(row, 0)?,
        event_type: parsed(row, 1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        object_ref,
        object_title: row.get(6)?,
        metadata,
        is_broadcast: row.get(8)?,
        created_at: timestamp(row, 9)?,
    })
}
