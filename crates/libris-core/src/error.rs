// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Libris notification service.

use serde::Serialize;
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::types::{EventId, UserId};

/// The primary error type used across all Libris traits and core operations.
#[derive(Debug, Error)]
pub enum LibrisError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-supplied data was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// One or more audience members are not known to the user store.
    #[error("unknown user(s): {}", format_user_ids(user_ids))]
    UnknownUser { user_ids: Vec<UserId> },

    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// The event exists but is targeted at other users.
    #[error("event {0} is not visible to this user")]
    NotVisible(EventId),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Operation aborted through its cancellation signal.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_user_ids(ids: &[UserId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Caller-facing error classification.
///
/// This is the vocabulary used on the wire (`{"error": "<kind>"}`) and in
/// fan-out reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
pub enum ErrorKind {
    ValidationError,
    UnknownUser,
    EventNotFound,
    NotVisible,
    StorageError,
    Cancelled,
}

impl LibrisError {
    /// Map this error onto the caller-facing taxonomy.
    ///
    /// Timeouts and internal failures surface as `StorageError`: from the
    /// caller's point of view they are failures of the backing store round-trip.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibrisError::Config(_) | LibrisError::Validation(_) => ErrorKind::ValidationError,
            LibrisError::UnknownUser { .. } => ErrorKind::UnknownUser,
            LibrisError::EventNotFound(_) => ErrorKind::EventNotFound,
            LibrisError::NotVisible(_) => ErrorKind::NotVisible,
            LibrisError::Storage { .. }
            | LibrisError::Timeout { .. }
            | LibrisError::Internal(_) => ErrorKind::StorageError,
            LibrisError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LibrisError::Storage { .. } | LibrisError::Timeout { .. }
        )
    }

    /// Shorthand for wrapping any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LibrisError::Storage {
            source: Box::new(err),
        }
    }
}
