// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Libris notification service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, the event store and recipient
//! status store, and read-only directory collaborators over the library's
//! read-model tables.

pub mod adapter;
pub mod database;
pub mod directory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use directory::SqliteDirectory;
