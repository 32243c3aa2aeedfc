// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation and persistence of new notification events.

use std::sync::Arc;

use libris_config::model::PublisherConfig;
use libris_core::types::{MAX_MESSAGE_LEN, MAX_OBJECT_ID_LEN, MAX_OBJECT_TITLE_LEN, MAX_TITLE_LEN};
use libris_core::{
    Audience, Clock, Event, EventId, EventStore, LibrisError, PublishRequest, UserId, UserStore,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ops::bounded;

/// Turns publish requests into stored events.
///
/// A request is accepted in full or not at all: either the event and every
/// recipient row are committed, or nothing is.
pub struct Publisher {
    store: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    config: PublisherConfig,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        config: PublisherConfig,
    ) -> Self {
        Self {
            store,
            users,
            clock,
            config,
        }
    }

    /// Validate and persist one event, returning its id.
    pub async fn publish(
        &self,
        request: PublishRequest,
        cancel: &CancellationToken,
    ) -> Result<EventId, LibrisError> {
        validate_request(&request, self.config.max_metadata_bytes)?;
        bounded(self.config.timeout(), cancel, self.persist(request)).await
    }

    async fn persist(&self, request: PublishRequest) -> Result<EventId, LibrisError> {
        let recipients: Vec<UserId> = match &request.audience {
            Audience::Targeted(users) => users.iter().copied().collect(),
            Audience::Broadcast => Vec::new(),
        };

        if !recipients.is_empty() {
            let known = self.users.get_many(&recipients).await?;
            let missing: Vec<UserId> = recipients
                .iter()
                .filter(|id| !known.contains_key(id))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(LibrisError::UnknownUser { user_ids: missing });
            }
        }

        let event = Event {
            event_id: EventId::new(),
            event_type: request.event_type,
            title: request.title,
            message: request.message,
            object_ref: request.object_ref,
            object_title: request.object_title,
            metadata: request.metadata,
            is_broadcast: request.audience.is_broadcast(),
            created_at: self.clock.now(),
        };

        self.store.insert_event(&event, &recipients).await?;

        debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            recipients = recipients.len(),
            broadcast = event.is_broadcast,
            "event published"
        );
        Ok(event.event_id)
    }
}

/// Check a request's shape without touching any store.
pub fn validate_request(
    request: &PublishRequest,
    max_metadata_bytes: usize,
) -> Result<(), LibrisError> {
    check_text("title", &request.title, MAX_TITLE_LEN)?;
    check_text("message", &request.message, MAX_MESSAGE_LEN)?;

    match (&request.object_ref, &request.object_title) {
        (None, Some(_)) => {
            return Err(invalid("object_title requires an object reference"));
        }
        (Some(object), title) => {
            if object.id.trim().is_empty() {
                return Err(invalid("object id must not be empty"));
            }
            if object.id.chars().count() > MAX_OBJECT_ID_LEN {
                return Err(invalid(format!(
                    "object id exceeds {MAX_OBJECT_ID_LEN} characters"
                )));
            }
            if let Some(title) = title {
                if title.chars().count() > MAX_OBJECT_TITLE_LEN {
                    return Err(invalid(format!(
                        "object_title exceeds {MAX_OBJECT_TITLE_LEN} characters"
                    )));
                }
            }
        }
        (None, None) => {}
    }

    if let Some(metadata) = &request.metadata {
        let raw = metadata.get();
        if !raw.trim_start().starts_with('{') {
            return Err(invalid("metadata must be a JSON object"));
        }
        if raw.len() > max_metadata_bytes {
            return Err(invalid(format!(
                "metadata exceeds {max_metadata_bytes} bytes"
            )));
        }
    }

    if let Audience::Targeted(users) = &request.audience {
        if users.is_empty() {
            return Err(invalid("targeted audience must not be empty"));
        }
    }

    Ok(())
}

fn check_text(field: &str, value: &str, max: usize) -> Result<(), LibrisError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(invalid(format!("{field} exceeds {max} characters")));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> LibrisError {
    LibrisError::Validation(msg.into())
}
