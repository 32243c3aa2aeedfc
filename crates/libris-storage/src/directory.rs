// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed directory collaborators.
//!
//! The primary library backend owns `users`, `reservations` and `borrows`;
//! this adapter only reads them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libris_core::{BorrowStore, DueBorrow, LibrisError, ReservationStore, User, UserId, UserStore};

use crate::database::Database;
use crate::queries::directory;

/// Read-only view of the library's users, reservations and borrows.
#[derive(Clone)]
pub struct SqliteDirectory {
    db: Database,
}

impl SqliteDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SqliteDirectory {
    async fn get_many(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, LibrisError> {
        directory::users_by_id(&self.db, ids).await
    }
}

#[async_trait]
impl ReservationStore for SqliteDirectory {
    async fn pending_by_book(&self, book_id: &str) -> Result<Vec<UserId>, LibrisError> {
        directory::pending_reservation_holders(&self.db, book_id).await
    }
}

#[async_trait]
impl BorrowStore for SqliteDirectory {
    async fn due_within(
        &self,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<DueBorrow>, LibrisError> {
        let horizon = chrono::Duration::from_std(horizon)
            .map_err(|e| LibrisError::Validation(format!("horizon out of range: {e}")))?;
        let until = now
            .checked_add_signed(horizon)
            .ok_or_else(|| LibrisError::Validation("horizon out of range".into()))?;
        directory::unreturned_borrows_due(&self.db, Some(now), until).await
    }

    async fn overdue_as_of(&self, as_of: DateTime<Utc>) -> Result<Vec<DueBorrow>, LibrisError> {
        directory::unreturned_borrows_due(&self.db, None, as_of).await
    }
}
