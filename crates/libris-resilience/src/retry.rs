// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy with exponential backoff and multiplicative jitter.
//!
//! Retry `n` (1-based) waits `base * factor^(n-1)`, capped at `max_delay`,
//! then scaled by a factor drawn uniformly from `[1 - jitter, 1 + jitter]`.
//! Only errors for which [`LibrisError::is_transient`] holds are retried.

use std::future::Future;
use std::time::Duration;

use libris_core::LibrisError;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied per retry.
    pub factor: f64,
    /// Relative jitter in `[0, 1)`.
    pub jitter: f64,
    /// Upper bound on the un-jittered delay.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            factor: 2.0,
            jitter: 0.2,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Retry policy for transient failures.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Delay before retry `attempt` (1-based) without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let secs = self.config.base_delay.as_secs_f64() * self.config.factor.powi(exp);
        let cap = self.config.max_delay.as_secs_f64();
        if secs.is_finite() && secs < cap {
            Duration::from_secs_f64(secs.max(0.0))
        } else {
            self.config.max_delay
        }
    }

    /// Jittered delay before retry `attempt`, using `rng`.
    pub fn delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        let j = self.config.jitter.clamp(0.0, 0.99);
        if j == 0.0 || base.is_zero() {
            return base;
        }
        base.mul_f64(rng.gen_range(1.0 - j..=1.0 + j))
    }

    /// Jittered delay before retry `attempt`, using the thread RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `op` receives the 0-based attempt number. A backoff sleep interrupted
    /// by `cancel` returns [`LibrisError::Cancelled`]; an attempt that is
    /// already running is not interrupted.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, LibrisError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, LibrisError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.delay(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(LibrisError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
