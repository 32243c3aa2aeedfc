// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the event store, publisher, and reader.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::cursor::FeedCursor;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum message body length in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Maximum length of the object title snapshot in characters.
pub const MAX_OBJECT_TITLE_LEN: usize = 255;

/// Maximum length of a related object identifier.
pub const MAX_OBJECT_ID_LEN: usize = 64;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of an event in the event store.
    EventId
);

uuid_id!(
    /// Unique identifier of a user, as issued by the user store.
    UserId
);

/// Notification-worthy occurrence kinds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    BookAvailable,
    BorrowDueSoon,
    BorrowOverdue,
    ReservationReady,
    SubscriptionActivated,
    SubscriptionExpired,
    SystemAlert,
}

/// Kind of domain object an event may point at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Book,
    Borrow,
    Reservation,
    Subscription,
}

/// Reference to the domain object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Who should see an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// An explicit, non-empty set of users.
    Targeted(BTreeSet<UserId>),
    /// Every user, materialized lazily per reader.
    Broadcast,
}

impl Audience {
    /// Audience of exactly one user.
    pub fn user(id: UserId) -> Self {
        Audience::Targeted(BTreeSet::from([id]))
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Audience::Broadcast)
    }
}

/// Input to the publisher.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub object_ref: Option<ObjectRef>,
    /// Snapshot of the related object's display title. Requires `object_ref`.
    pub object_title: Option<String>,
    /// Opaque JSON object, stored and returned verbatim.
    pub metadata: Option<Box<RawValue>>,
    pub audience: Audience,
}

impl PublishRequest {
    /// A request targeted at a set of users.
    pub fn targeted(
        event_type: EventType,
        title: impl Into<String>,
        message: impl Into<String>,
        users: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            event_type,
            title: title.into(),
            message: message.into(),
            object_ref: None,
            object_title: None,
            metadata: None,
            audience: Audience::Targeted(users.into_iter().collect()),
        }
    }

    /// A request visible to every user.
    pub fn broadcast(
        event_type: EventType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            title: title.into(),
            message: message.into(),
            object_ref: None,
            object_title: None,
            metadata: None,
            audience: Audience::Broadcast,
        }
    }

    /// Attach a related object and its title snapshot.
    pub fn with_object(
        mut self,
        kind: ObjectKind,
        id: impl Into<String>,
        title: Option<String>,
    ) -> Self {
        self.object_ref = Some(ObjectRef::new(kind, id));
        self.object_title = title;
        self
    }

    /// Attach an opaque metadata blob.
    pub fn with_metadata(mut self, metadata: Box<RawValue>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An immutable record in the event store.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: EventId,
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub object_ref: Option<ObjectRef>,
    pub object_title: Option<String>,
    pub metadata: Option<Box<RawValue>>,
    pub is_broadcast: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-user read state of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientStatus {
    pub user_id: UserId,
    pub event_id: EventId,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Object reference as rendered in a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSnapshot {
    pub kind: ObjectKind,
    pub id: String,
    pub title: Option<String>,
}

/// One entry of a user's notification feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub message: String,
    pub object: Option<ObjectSnapshot>,
    pub metadata: Option<Box<RawValue>>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    /// Build a feed item from a stored event and the reader's derived read flag.
    pub fn from_event(event: Event, is_read: bool) -> Self {
        let object = event.object_ref.map(|r| ObjectSnapshot {
            kind: r.kind,
            id: r.id,
            title: event.object_title,
        });
        Self {
            id: event.event_id,
            event_type: event.event_type,
            title: event.title,
            message: event.message,
            object,
            metadata: event.metadata,
            is_read,
            created_at: event.created_at,
        }
    }

    /// Cursor pointing just past this item.
    pub fn cursor(&self) -> FeedCursor {
        FeedCursor {
            created_at: self.created_at,
            event_id: self.id,
        }
    }
}

/// One page of a user's feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<FeedCursor>,
}

/// Parameters of a single feed page lookup against the store.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub user_id: UserId,
    /// Broadcasts created before this instant are not part of the feed.
    pub visible_since: DateTime<Utc>,
    /// Return only items strictly older than this position.
    pub before: Option<FeedCursor>,
    pub limit: usize,
}

/// Outcome of `mark_read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkResult {
    /// `false` when the notification was already read.
    pub changed: bool,
}

/// A user as known to the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Account creation time; broadcasts older than this are not shown.
    pub created_at: DateTime<Utc>,
}

/// Health status of a backing adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// A borrow approaching (or past) its due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueBorrow {
    pub borrow_id: String,
    pub user_id: UserId,
    pub book_title: String,
    pub due_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_wire_names() {
        assert_eq!(EventType::BookAvailable.to_string(), "BOOK_AVAILABLE");
        assert_eq!(
            EventType::from_str("SUBSCRIPTION_EXPIRED").unwrap(),
            EventType::SubscriptionExpired
        );
        assert!(EventType::from_str("BOOK_RETURNED").is_err());
        let json = serde_json::to_string(&EventType::SystemAlert).unwrap();
        assert_eq!(json, "\"SYSTEM_ALERT\"");
    }

    #[test]
    fn object_kind_is_lowercase() {
        assert_eq!(ObjectKind::Reservation.as_ref(), "reservation");
        assert_eq!(ObjectKind::from_str("book").unwrap(), ObjectKind::Book);
        assert!(ObjectKind::from_str("review").is_err());
    }

    #[test]
    fn ids_display_as_hyphenated_lowercase() {
        let id = EventId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(s, s.to_lowercase());
        assert_eq!(EventId::from_str(&s).unwrap(), id);
    }

    #[test]
    fn targeted_audience_dedups_users() {
        let u = UserId::new();
        let req = PublishRequest::targeted(EventType::SystemAlert, "t", "m", [u, u]);
        match req.audience {
            Audience::Targeted(users) => assert_eq!(users.len(), 1),
            Audience::Broadcast => panic!("expected targeted audience"),
        }
    }

    #[test]
    fn feed_item_serializes_wire_shape() {
        let created_at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = Event {
            event_id: EventId::new(),
            event_type: EventType::BookAvailable,
            title: "Now available".into(),
            message: "Dune is back on the shelf".into(),
            object_ref: Some(ObjectRef::new(ObjectKind::Book, "42")),
            object_title: Some("Dune".into()),
            metadata: Some(RawValue::from_string(r#"{"copies":2}"#.into()).unwrap()),
            is_broadcast: false,
            created_at,
        };
        let item = FeedItem::from_event(event, false);
        let value: serde_json::Value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "BOOK_AVAILABLE");
        assert_eq!(value["object"]["kind"], "book");
        assert_eq!(value["object"]["id"], "42");
        assert_eq!(value["object"]["title"], "Dune");
        assert_eq!(value["metadata"]["copies"], 2);
        assert_eq!(value["is_read"], false);
        assert_eq!(value["created_at"], "2026-03-01T10:00:00Z");
    }

    #[test]
    fn feed_item_without_object_renders_nulls() {
        let event = Event {
            event_id: EventId::new(),
            event_type: EventType::SystemAlert,
            title: "Maintenance".into(),
            message: "Down at noon".into(),
            object_ref: None,
            object_title: None,
            metadata: None,
            is_broadcast: true,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(FeedItem::from_event(event, true)).unwrap();
        assert!(value["object"].is_null());
        assert!(value["metadata"].is_null());
        assert_eq!(value["is_read"], true);
    }

    #[test]
    fn metadata_is_serialized_verbatim() {
        let raw = r#"{"b":1,  "a":"x"}"#;
        let event = Event {
            event_id: EventId::new(),
            event_type: EventType::SystemAlert,
            title: "t".into(),
            message: "m".into(),
            object_ref: None,
            object_title: None,
            metadata: Some(RawValue::from_string(raw.into()).unwrap()),
            is_broadcast: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&FeedItem::from_event(event, false)).unwrap();
        assert!(json.contains(raw));
    }
}
