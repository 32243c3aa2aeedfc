// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Libris notification service.
//!
//! This crate provides the data model of events and per-recipient read state,
//! the caller-facing error taxonomy, the clock and cursor primitives, and the
//! trait seams implemented by the storage crate and the library directory.

pub mod cursor;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use cursor::FeedCursor;
pub use error::{ErrorKind, LibrisError};
pub use time::{Clock, SystemClock};
pub use types::{
    Audience, DueBorrow, Event, EventId, EventType, FeedItem, FeedPage, FeedQuery, HealthStatus,
    MarkResult, ObjectKind, ObjectRef, ObjectSnapshot, PublishRequest, RecipientStatus, User,
    UserId,
};

pub use traits::{BorrowStore, EventStore, PluginAdapter, ReservationStore, UserStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_maps_to_a_wire_kind() {
        let cases = [
            (LibrisError::Config("bad".into()), ErrorKind::ValidationError),
            (LibrisError::Internal("boom".into()), ErrorKind::StorageError),
            (LibrisError::NotVisible(EventId::new()), ErrorKind::NotVisible),
            (LibrisError::Cancelled, ErrorKind::Cancelled),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn health_status_serializes_tagged() {
        let json = serde_json::to_value(HealthStatus::Degraded("slow".into())).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["detail"], "slow");
        assert!(HealthStatus::Healthy.is_healthy());
    }
}
