// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of domain triggers into per-recipient notifications.
//!
//! A trigger is first resolved into a list of planned notifications (one per
//! recipient), which are then published concurrently under a semaphore. Each
//! publish is retried on transient failure and fails independently of the
//! others. The dispatcher never returns an error: every outcome, including a
//! failed collaborator lookup, ends up in the [`FanOutReport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use libris_config::model::FanoutConfig;
use libris_core::types::{MAX_MESSAGE_LEN, MAX_OBJECT_TITLE_LEN};
use libris_core::{
    BorrowStore, Clock, DueBorrow, ErrorKind, EventId, EventType, LibrisError, ObjectKind,
    PublishRequest, ReservationStore, UserId,
};
use libris_resilience::{BackoffConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dedup::TriggerDedup;
use crate::ops::bounded;
use crate::publisher::Publisher;

/// A domain state change that implies notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DomainTrigger {
    /// A book went from zero to positive available copies.
    BookAvailable { book_id: String, title: String },
    /// Remind borrowers whose loans fall due within `horizon`.
    BorrowDueSoon {
        #[serde(rename = "horizon_secs", with = "duration_secs")]
        horizon: Duration,
    },
    /// Notify borrowers whose loans were due before `as_of` (default: now).
    BorrowOverdue {
        #[serde(default)]
        as_of: Option<DateTime<Utc>>,
    },
    SubscriptionExpired {
        subscription_id: String,
        user_id: UserId,
    },
    ReservationReady {
        reservation_id: String,
        user_id: UserId,
        book_title: String,
    },
    SubscriptionActivated {
        subscription_id: String,
        user_id: UserId,
        plan: String,
    },
}

impl DomainTrigger {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanOutReport {
    pub trigger: &'static str,
    /// Notifications the trigger resolved to.
    pub planned: usize,
    pub ok: usize,
    pub failed: Vec<(UserId, ErrorKind)>,
    /// Suppressed by a live dedup claim.
    pub skipped: usize,
    /// Never started because the fan-out was cancelled or ran out of time.
    pub not_attempted: usize,
    pub cancelled: bool,
    /// Set when the recipient lookup itself failed; nothing was published.
    pub resolve_error: Option<ErrorKind>,
    pub elapsed_ms: u64,
}

impl FanOutReport {
    fn new(trigger: &'static str) -> Self {
        Self {
            trigger,
            ..Self::default()
        }
    }

    /// `true` when every planned notification was published or skipped.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.resolve_error.is_none()
            && !self.cancelled
            && self.not_attempted == 0
    }

    /// Log the report: `info` when clean, `warn` otherwise.
    pub fn emit(&self) {
        if self.is_clean() {
            info!(
                trigger = self.trigger,
                planned = self.planned,
                ok = self.ok,
                skipped = self.skipped,
                elapsed_ms = self.elapsed_ms,
                "fan-out complete"
            );
        } else {
            warn!(
                trigger = self.trigger,
                planned = self.planned,
                ok = self.ok,
                failed = self.failed.len(),
                skipped = self.skipped,
                not_attempted = self.not_attempted,
                cancelled = self.cancelled,
                resolve_error = ?self.resolve_error,
                elapsed_ms = self.elapsed_ms,
                "fan-out incomplete"
            );
        }
    }
}

/// One notification the trigger resolved to.
#[derive(Debug, Clone)]
struct Planned {
    user_id: UserId,
    /// Distinguishes this notification within the trigger for dedup.
    discriminator: String,
    request: PublishRequest,
}

impl Planned {
    fn for_user(user_id: UserId, request: PublishRequest) -> Self {
        Self {
            user_id,
            discriminator: user_id.to_string(),
            request,
        }
    }
}

#[derive(Serialize)]
struct BorrowMetadata<'a> {
    borrow_id: &'a str,
    due_at: DateTime<Utc>,
}

/// Resolves triggers and publishes one event per recipient.
pub struct Dispatcher {
    publisher: Arc<Publisher>,
    reservations: Arc<dyn ReservationStore>,
    borrows: Arc<dyn BorrowStore>,
    clock: Arc<dyn Clock>,
    dedup: TriggerDedup,
    retry: RetryPolicy,
    config: FanoutConfig,
}

impl Dispatcher {
    pub fn new(
        publisher: Arc<Publisher>,
        reservations: Arc<dyn ReservationStore>,
        borrows: Arc<dyn BorrowStore>,
        clock: Arc<dyn Clock>,
        config: FanoutConfig,
    ) -> Self {
        let retry = RetryPolicy::new(BackoffConfig {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_backoff_ms),
            factor: config.backoff_factor,
            jitter: config.jitter,
            ..BackoffConfig::default()
        });
        Self {
            publisher,
            reservations,
            borrows,
            clock,
            dedup: TriggerDedup::new(),
            retry,
            config,
        }
    }

    /// Replace the retry policy built from configuration.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fan out `trigger`, deduplicating on `trigger_key` for the configured TTL.
    pub async fn fan_out(
        &self,
        trigger: DomainTrigger,
        trigger_key: Option<&str>,
        cancel: &CancellationToken,
    ) -> FanOutReport {
        self.fan_out_with_ttl(trigger, trigger_key, self.config.dedup_ttl(), cancel)
            .await
    }

    /// Fan out `trigger`, holding dedup claims for `dedup_ttl`.
    pub async fn fan_out_with_ttl(
        &self,
        trigger: DomainTrigger,
        trigger_key: Option<&str>,
        dedup_ttl: Duration,
        cancel: &CancellationToken,
    ) -> FanOutReport {
        let started = Instant::now();
        let mut report = FanOutReport::new(trigger.name());

        // The overall deadline cancels a child token so the caller's token is
        // never touched.
        let token = cancel.child_token();
        let watchdog = {
            let token = token.clone();
            let timeout = self.config.timeout();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        };

        match bounded(self.config.timeout(), &token, self.plan(&trigger)).await {
            Ok(planned) => {
                report.planned = planned.len();
                let dedup = trigger_key.map(|key| (key, dedup_ttl));
                self.dispatch(planned, dedup, &token, &mut report).await;
            }
            Err(err) => {
                warn!(trigger = report.trigger, error = %err, "fan-out recipient lookup failed");
                report.resolve_error = Some(err.kind());
            }
        }

        report.cancelled = token.is_cancelled();
        watchdog.abort();
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        report.emit();
        report
    }

    async fn dispatch(
        &self,
        planned: Vec<Planned>,
        dedup: Option<(&str, Duration)>,
        token: &CancellationToken,
        report: &mut FanOutReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, (UserId, Option<String>)> = HashMap::new();

        let mut queue = planned.into_iter();
        while let Some(item) = queue.next() {
            let claim = match dedup {
                Some((key, ttl)) => {
                    let claim = format!("{key}:{}", item.discriminator);
                    if !self.dedup.claim(&claim, ttl) {
                        debug!(claim = %claim, "duplicate trigger, skipping recipient");
                        report.skipped += 1;
                        continue;
                    }
                    Some(claim)
                }
                None => None,
            };

            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                if let Some(claim) = &claim {
                    self.dedup.release(claim);
                }
                report.not_attempted += 1 + queue.len();
                break;
            };

            let publisher = Arc::clone(&self.publisher);
            let retry = self.retry.clone();
            let token = token.clone();
            let request = item.request;
            let handle = tasks.spawn(async move {
                let _permit = permit;
                retry
                    .run(&token, |_| {
                        let publisher = Arc::clone(&publisher);
                        let request = request.clone();
                        async move {
                            // Started publishes run to completion even when the
                            // fan-out is cancelled.
                            let detached = CancellationToken::new();
                            publisher.publish(request, &detached).await
                        }
                    })
                    .await
            });
            pending.insert(handle.id(), (item.user_id, claim));

            while let Some(done) = tasks.try_join_next_with_id() {
                self.record(done, &mut pending, report);
            }
        }

        while let Some(done) = tasks.join_next_with_id().await {
            self.record(done, &mut pending, report);
        }
    }

    fn record(
        &self,
        done: Result<(tokio::task::Id, Result<EventId, LibrisError>), tokio::task::JoinError>,
        pending: &mut HashMap<tokio::task::Id, (UserId, Option<String>)>,
        report: &mut FanOutReport,
    ) {
        let (id, outcome) = match done {
            Ok((id, outcome)) => (id, outcome),
            Err(join_err) => (
                join_err.id(),
                Err(LibrisError::Internal(format!("publish task failed: {join_err}"))),
            ),
        };
        let Some((user_id, claim)) = pending.remove(&id) else {
            return;
        };

        match outcome {
            Ok(event_id) => {
                debug!(user_id = %user_id, event_id = %event_id, "recipient notified");
                report.ok += 1;
            }
            Err(err) => {
                if let Some(claim) = &claim {
                    self.dedup.release(claim);
                }
                warn!(user_id = %user_id, error = %err, "fan-out publish failed");
                report.failed.push((user_id, err.kind()));
            }
        }
    }

    async fn plan(&self, trigger: &DomainTrigger) -> Result<Vec<Planned>, LibrisError> {
        match trigger {
            DomainTrigger::BookAvailable { book_id, title } => {
                if book_id.trim().is_empty() {
                    return Err(LibrisError::Validation("book_id must not be empty".into()));
                }
                let holders = self.reservations.pending_by_book(book_id).await?;
                Ok(holders
                    .into_iter()
                    .map(|user_id| {
                        let request = PublishRequest::targeted(
                            EventType::BookAvailable,
                            "Book available",
                            clip(
                                &format!("\"{title}\" is now available to borrow."),
                                MAX_MESSAGE_LEN,
                            ),
                            [user_id],
                        )
                        .with_object(
                            ObjectKind::Book,
                            book_id.clone(),
                            Some(clip(title, MAX_OBJECT_TITLE_LEN)),
                        );
                        Planned::for_user(user_id, request)
                    })
                    .collect())
            }
            DomainTrigger::BorrowDueSoon { horizon } => {
                let borrows = self.borrows.due_within(self.clock.now(), *horizon).await?;
                borrows
                    .iter()
                    .map(|borrow| {
                        let message = format!(
                            "\"{}\" is due back on {}.",
                            borrow.book_title,
                            borrow.due_at.format("%Y-%m-%d %H:%M UTC")
                        );
                        borrow_notice(EventType::BorrowDueSoon, "Return due soon", message, borrow)
                    })
                    .collect()
            }
            DomainTrigger::BorrowOverdue { as_of } => {
                let as_of = as_of.unwrap_or_else(|| self.clock.now());
                let borrows = self.borrows.overdue_as_of(as_of).await?;
                borrows
                    .iter()
                    .map(|borrow| {
                        let message = format!(
                            "\"{}\" was due back on {}. Please return it.",
                            borrow.book_title,
                            borrow.due_at.format("%Y-%m-%d %H:%M UTC")
                        );
                        borrow_notice(EventType::BorrowOverdue, "Borrow overdue", message, borrow)
                    })
                    .collect()
            }
            DomainTrigger::SubscriptionExpired {
                subscription_id,
                user_id,
            } => {
                let request = PublishRequest::targeted(
                    EventType::SubscriptionExpired,
                    "Subscription expired",
                    "Your subscription has expired. Renew it to keep borrowing.",
                    [*user_id],
                )
                .with_object(ObjectKind::Subscription, subscription_id.clone(), None);
                Ok(vec![Planned::for_user(*user_id, request)])
            }
            DomainTrigger::ReservationReady {
                reservation_id,
                user_id,
                book_title,
            } => {
                let request = PublishRequest::targeted(
                    EventType::ReservationReady,
                    "Reservation ready",
                    clip(
                        &format!("\"{book_title}\" is ready for pickup."),
                        MAX_MESSAGE_LEN,
                    ),
                    [*user_id],
                )
                .with_object(
                    ObjectKind::Reservation,
                    reservation_id.clone(),
                    Some(clip(book_title, MAX_OBJECT_TITLE_LEN)),
                );
                Ok(vec![Planned::for_user(*user_id, request)])
            }
            DomainTrigger::SubscriptionActivated {
                subscription_id,
                user_id,
                plan,
            } => {
                let request = PublishRequest::targeted(
                    EventType::SubscriptionActivated,
                    "Subscription activated",
                    clip(
                        &format!("Your {plan} subscription is now active."),
                        MAX_MESSAGE_LEN,
                    ),
                    [*user_id],
                )
                .with_object(ObjectKind::Subscription, subscription_id.clone(), None);
                Ok(vec![Planned::for_user(*user_id, request)])
            }
        }
    }
}

fn borrow_notice(
    event_type: EventType,
    title: &str,
    message: String,
    borrow: &DueBorrow,
) -> Result<Planned, LibrisError> {
    let metadata = serde_json::value::to_raw_value(&BorrowMetadata {
        borrow_id: &borrow.borrow_id,
        due_at: borrow.due_at,
    })
    .map_err(|e| LibrisError::Internal(format!("encode borrow metadata: {e}")))?;

    let request = PublishRequest::targeted(
        event_type,
        title,
        clip(&message, MAX_MESSAGE_LEN),
        [borrow.user_id],
    )
    .with_object(
        ObjectKind::Borrow,
        borrow.borrow_id.clone(),
        Some(clip(&borrow.book_title, MAX_OBJECT_TITLE_LEN)),
    )
    .with_metadata(metadata);

    Ok(Planned {
        user_id: borrow.user_id,
        discriminator: format!("{}:{}", borrow.borrow_id, borrow.user_id),
        request,
    })
}

fn clip(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
