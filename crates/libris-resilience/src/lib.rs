// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for the Libris notification service.
//!
//! Currently a single policy: bounded retries of transient failures with
//! exponential, jittered backoff that aborts on cancellation.

pub mod retry;

pub use retry::{BackoffConfig, RetryPolicy};
