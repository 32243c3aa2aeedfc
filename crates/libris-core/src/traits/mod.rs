// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the notification core.
//!
//! [`EventStore`] is implemented by the persistence crate. The directory
//! traits are implemented by whoever owns users, reservations and borrows.
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod storage;

pub use adapter::PluginAdapter;
pub use directory::{BorrowStore, ReservationStore, UserStore};
pub use storage::EventStore;
