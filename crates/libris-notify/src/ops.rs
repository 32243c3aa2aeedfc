// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::future::Future;
use std::time::Duration;

use libris_core::LibrisError;
use tokio_util::sync::CancellationToken;

/// Run `fut` under a deadline, giving up early if `cancel` fires.
///
/// Dropping `fut` does not roll back a store call that was already handed to
/// the connection thread; such calls finish on their own and are atomic.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, LibrisError>
where
    F: Future<Output = Result<T, LibrisError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LibrisError::Cancelled),
        res = tokio::time::timeout(timeout, fut) => {
            res.unwrap_or(Err(LibrisError::Timeout { duration: timeout }))
        }
    }
}
