// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque feed pagination cursor.
//!
//! A cursor encodes the `(created_at, event_id)` position of the last item of
//! a page. The next page holds items strictly older than that position in the
//! feed order (`created_at DESC, event_id DESC`), so newer inserts never shift
//! pages that are already being walked.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::LibrisError;
use crate::time::{format_timestamp, parse_timestamp};
use crate::types::EventId;

/// Position in a feed, exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub event_id: EventId,
}

impl FeedCursor {
    /// Render the cursor as an opaque URL-safe token.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", format_timestamp(&self.created_at), self.event_id);
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Parse a token produced by [`FeedCursor::encode`].
    pub fn decode(token: &str) -> Result<Self, LibrisError> {
        let invalid = || LibrisError::Validation("invalid cursor".to_string());

        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (ts, id) = raw.split_once('|').ok_or_else(invalid)?;

        Ok(Self {
            created_at: parse_timestamp(ts).map_err(|_| invalid())?,
            event_id: id.parse().map_err(|_| invalid())?,
        })
    }
}

impl Serialize for FeedCursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}
