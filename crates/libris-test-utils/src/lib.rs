// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Libris integration tests.
//!
//! Provides in-memory collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`InMemoryDirectory`] - users, reservations and borrows with failure injection
//! - [`ManualClock`] - settable, optionally ticking clock
//! - [`TestHarness`] - temp SQLite store wired to every service and the router

pub mod clock;
pub mod directory;
pub mod harness;

pub use clock::ManualClock;
pub use directory::InMemoryDirectory;
pub use harness::{TEST_BEARER_TOKEN, TestHarness, TestHarnessBuilder};
