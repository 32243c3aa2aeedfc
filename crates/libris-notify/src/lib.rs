// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification services for Libris.
//!
//! - [`Publisher`] validates requests and persists events with their recipients.
//! - [`Dispatcher`] turns domain triggers into concurrent per-recipient publishes.
//! - [`Reader`] serves feeds, unread counts, and read-state changes.
//! - [`ReminderSweep`] periodically dispatches borrow reminders.

pub mod dedup;
pub mod dispatcher;
mod ops;
pub mod publisher;
pub mod reader;
pub mod reminder;

pub use dedup::TriggerDedup;
pub use dispatcher::{Dispatcher, DomainTrigger, FanOutReport};
pub use publisher::{Publisher, validate_request};
pub use reader::Reader;
pub use reminder::ReminderSweep;
