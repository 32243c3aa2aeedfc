// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only collaborators owned by the primary library backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LibrisError;
use crate::types::{DueBorrow, User, UserId};

/// Lookup of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Resolve many users in one round-trip. Unknown ids are absent from the map.
    async fn get_many(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, LibrisError>;
}

/// Reservation queue of the catalogue.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Users holding a pending reservation for the given book.
    async fn pending_by_book(&self, book_id: &str) -> Result<Vec<UserId>, LibrisError>;
}

/// Active borrows.
#[async_trait]
pub trait BorrowStore: Send + Sync {
    /// Unreturned borrows due in `(now, now + horizon]`.
    async fn due_within(
        &self,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<DueBorrow>, LibrisError>;

    /// Unreturned borrows whose due date is at or before `as_of`.
    async fn overdue_as_of(&self, as_of: DateTime<Utc>) -> Result<Vec<DueBorrow>, LibrisError>;
}
