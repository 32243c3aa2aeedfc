// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory directory collaborators for deterministic testing.
//!
//! `InMemoryDirectory` implements `UserStore`, `ReservationStore` and
//! `BorrowStore` over plain maps, with hooks to remove users after they were
//! listed and to inject transient failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use libris_core::{
    BorrowStore, DueBorrow, LibrisError, ReservationStore, User, UserId, UserStore,
};

#[derive(Debug, Clone)]
struct Reservation {
    book_id: String,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Borrow {
    due: DueBorrow,
    returned: bool,
}

/// A mock library directory for testing.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Mutex<HashMap<UserId, User>>,
    reservations: Mutex<Vec<Reservation>>,
    borrows: Mutex<Vec<Borrow>>,
    user_lookup_failures: AtomicU32,
    listing_failures: AtomicU32,
    lookup_latency_ms: AtomicU64,
    lookups_in_flight: AtomicUsize,
    max_lookups_in_flight: AtomicUsize,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user created at `created_at`.
    pub async fn add_user(&self, id: UserId, created_at: DateTime<Utc>) {
        self.users.lock().await.insert(id, User { id, created_at });
    }

    /// Delete a user. Their reservations and borrows are kept, as if the
    /// deletion raced with a listing.
    pub async fn remove_user(&self, id: UserId) {
        self.users.lock().await.remove(&id);
    }

    /// Add a pending reservation of `book_id` by `user_id`.
    pub async fn add_reservation(
        &self,
        book_id: &str,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) {
        self.reservations.lock().await.push(Reservation {
            book_id: book_id.to_string(),
            user_id,
            created_at,
        });
    }

    /// Add an unreturned borrow.
    pub async fn add_borrow(&self, borrow: DueBorrow) {
        self.borrows.lock().await.push(Borrow {
            due: borrow,
            returned: false,
        });
    }

    /// Mark a borrow returned so it is no longer listed.
    pub async fn return_borrow(&self, borrow_id: &str) {
        for borrow in self.borrows.lock().await.iter_mut() {
            if borrow.due.borrow_id == borrow_id {
                borrow.returned = true;
            }
        }
    }

    /// Make the next `n` `get_many` calls fail with a transient error.
    pub fn fail_user_lookups(&self, n: u32) {
        self.user_lookup_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` reservation or borrow listings fail with a transient error.
    pub fn fail_listings(&self, n: u32) {
        self.listing_failures.store(n, Ordering::SeqCst);
    }

    /// Make every `get_many` call take at least `latency`.
    pub fn set_lookup_latency(&self, latency: Duration) {
        let ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.lookup_latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Highest number of `get_many` calls observed running at once.
    pub fn max_lookups_in_flight(&self) -> usize {
        self.max_lookups_in_flight.load(Ordering::SeqCst)
    }

    fn take_failure(counter: &AtomicU32, what: &str) -> Result<(), LibrisError> {
        let injected = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            Err(LibrisError::storage(std::io::Error::other(format!(
                "injected {what} failure"
            ))))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn get_many(&self, ids: &[UserId]) -> Result<HashMap<UserId, User>, LibrisError> {
        let in_flight = self.lookups_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lookups_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let latency = self.lookup_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.lookups_in_flight.fetch_sub(1, Ordering::SeqCst);

        Self::take_failure(&self.user_lookup_failures, "user lookup")?;
        let users = self.users.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.clone())))
            .collect())
    }
}

#[async_trait]
impl ReservationStore for InMemoryDirectory {
    async fn pending_by_book(&self, book_id: &str) -> Result<Vec<UserId>, LibrisError> {
        Self::take_failure(&self.listing_failures, "reservation listing")?;
        let mut pending: Vec<Reservation> = self
            .reservations
            .lock()
            .await
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);

        let mut holders = Vec::with_capacity(pending.len());
        for r in pending {
            if !holders.contains(&r.user_id) {
                holders.push(r.user_id);
            }
        }
        Ok(holders)
    }
}

#[async_trait]
impl BorrowStore for InMemoryDirectory {
    async fn due_within(
        &self,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<DueBorrow>, LibrisError> {
        Self::take_failure(&self.listing_failures, "borrow listing")?;
        let horizon = chrono::Duration::from_std(horizon)
            .map_err(|e| LibrisError::Validation(format!("horizon out of range: {e}")))?;
        let until = now
            .checked_add_signed(horizon)
            .ok_or_else(|| LibrisError::Validation("horizon out of range".into()))?;
        Ok(self.matching(|due_at| due_at > now && due_at <= until).await)
    }

    async fn overdue_as_of(&self, as_of: DateTime<Utc>) -> Result<Vec<DueBorrow>, LibrisError> {
        Self::take_failure(&self.listing_failures, "borrow listing")?;
        Ok(self.matching(|due_at| due_at <= as_of).await)
    }
}

impl InMemoryDirectory {
    async fn matching(&self, pred: impl Fn(DateTime<Utc>) -> bool) -> Vec<DueBorrow> {
        let mut out: Vec<DueBorrow> = self
            .borrows
            .lock()
            .await
            .iter()
            .filter(|b| !b.returned && pred(b.due.due_at))
            .map(|b| b.due.clone())
            .collect();
        out.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.borrow_id.cmp(&b.borrow_id)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_767_225_600 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn get_many_returns_only_known_users() {
        let dir = InMemoryDirectory::new();
        let (a, b) = (UserId::new(), UserId::new());
        dir.add_user(a, at(0)).await;
        let found = dir.get_many(&[a, b]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&a));
    }

    #[tokio::test]
    async fn removed_user_keeps_reservation() {
        let dir = InMemoryDirectory::new();
        let u = UserId::new();
        dir.add_user(u, at(0)).await;
        dir.add_reservation("b-1", u, at(1)).await;
        dir.remove_user(u).await;
        assert_eq!(dir.pending_by_book("b-1").await.unwrap(), vec![u]);
        assert!(dir.get_many(&[u]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn holders_are_ordered_by_first_reservation() {
        let dir = InMemoryDirectory::new();
        let (a, b) = (UserId::new(), UserId::new());
        dir.add_reservation("b-1", b, at(5)).await;
        dir.add_reservation("b-1", a, at(1)).await;
        dir.add_reservation("b-1", b, at(9)).await;
        dir.add_reservation("b-2", a, at(2)).await;
        assert_eq!(dir.pending_by_book("b-1").await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn injected_failures_are_transient_and_counted() {
        let dir = InMemoryDirectory::new();
        dir.fail_user_lookups(2);
        assert!(dir.get_many(&[]).await.unwrap_err().is_transient());
        assert!(dir.get_many(&[]).await.is_err());
        assert!(dir.get_many(&[]).await.is_ok());
    }

    #[tokio::test]
    async fn borrow_windows() {
        let dir = InMemoryDirectory::new();
        let u = UserId::new();
        for (id, due) in [("late", -60), ("soon", 3_600), ("later", 200_000)] {
            dir.add_borrow(DueBorrow {
                borrow_id: id.into(),
                user_id: u,
                book_title: "Dune".into(),
                due_at: at(due),
            })
            .await;
        }
        let soon = dir
            .due_within(at(0), Duration::from_secs(86_400))
            .await
            .unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].borrow_id, "soon");

        let overdue = dir.overdue_as_of(at(0)).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].borrow_id, "late");

        dir.return_borrow("late").await;
        assert!(dir.overdue_as_of(at(0)).await.unwrap().is_empty());
    }
}
