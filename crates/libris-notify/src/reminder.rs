// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic borrow reminders.

use std::sync::Arc;
use std::time::Duration;

use libris_config::model::ReminderConfig;
use libris_core::Clock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::{Dispatcher, DomainTrigger, FanOutReport};

/// Claims taken by a sweep are held for a day, so one borrow gets at most one
/// reminder of each kind per UTC date.
const REMINDER_DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Dispatches due-soon and overdue borrow reminders on an interval.
pub struct ReminderSweep {
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    config: ReminderConfig,
}

impl ReminderSweep {
    pub fn new(dispatcher: Arc<Dispatcher>, clock: Arc<dyn Clock>, config: ReminderConfig) -> Self {
        Self {
            dispatcher,
            clock,
            config,
        }
    }

    /// Run one sweep and return its fan-out reports.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Vec<FanOutReport> {
        let today = self.clock.now().format("%Y-%m-%d").to_string();
        let mut reports = Vec::with_capacity(2);

        let due_soon = DomainTrigger::BorrowDueSoon {
            horizon: self.config.due_soon_horizon(),
        };
        let key = format!("{}:{today}", due_soon.name());
        reports.push(
            self.dispatcher
                .fan_out_with_ttl(due_soon, Some(&key), REMINDER_DEDUP_TTL, cancel)
                .await,
        );

        if self.config.overdue_enabled && !cancel.is_cancelled() {
            let overdue = DomainTrigger::BorrowOverdue { as_of: None };
            let key = format!("{}:{today}", overdue.name());
            reports.push(
                self.dispatcher
                    .fan_out_with_ttl(overdue, Some(&key), REMINDER_DEDUP_TTL, cancel)
                    .await,
            );
        }

        reports
    }

    /// Sweep every `interval_secs` until `cancel` fires. The first sweep runs
    /// one full interval after start.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let reports = self.run_once(&cancel).await;
                    let sent: usize = reports.iter().map(|r| r.ok).sum();
                    debug!(sent, "reminder sweep finished");
                }
                _ = cancel.cancelled() => {
                    info!("reminder sweep shutting down");
                    break;
                }
            }
        }
    }
}
