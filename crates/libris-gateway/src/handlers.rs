// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the notification API.

use std::collections::BTreeSet;
use std::str::FromStr;

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use libris_core::{
    Audience, EventId, EventType, FeedPage, HealthStatus, MarkResult, ObjectKind, ObjectRef,
    PublishRequest, UserId,
};
use libris_notify::{DomainTrigger, FanOutReport};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Query string of `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cursor: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<usize>,
}

/// `?cursor=&limit=` means the parameters are absent.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.is_empty() => raw.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct PublishedResponse {
    pub id: EventId,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub storage: HealthStatus,
}

/// Related object in a publish body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectBody {
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastTag {
    Broadcast,
}

/// `"broadcast"` or `{ "user_ids": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AudienceBody {
    Broadcast(BroadcastTag),
    Targeted { user_ids: Vec<UserId> },
}

/// Request body for `POST /admin/events`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishBody {
    #[serde(rename = "type")]
    pub event_type: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub object: Option<ObjectBody>,
    #[serde(default)]
    pub metadata: Option<Box<RawValue>>,
    pub audience: AudienceBody,
}

impl TryFrom<PublishBody> for PublishRequest {
    type Error = ApiError;

    fn try_from(body: PublishBody) -> Result<Self, Self::Error> {
        let event_type = EventType::from_str(&body.event_type)
            .map_err(|_| ApiError::validation(format!("unknown event type: {}", body.event_type)))?;

        let (object_ref, object_title) = match body.object {
            Some(object) => {
                let kind = ObjectKind::from_str(&object.kind).map_err(|_| {
                    ApiError::validation(format!("unknown object kind: {}", object.kind))
                })?;
                (Some(ObjectRef::new(kind, object.id)), object.title)
            }
            None => (None, None),
        };

        let audience = match body.audience {
            AudienceBody::Broadcast(BroadcastTag::Broadcast) => Audience::Broadcast,
            AudienceBody::Targeted { user_ids } => {
                Audience::Targeted(user_ids.into_iter().collect::<BTreeSet<_>>())
            }
        };

        Ok(PublishRequest {
            event_type,
            title: body.title,
            message: body.message,
            object_ref,
            object_title,
            metadata: body.metadata,
            audience,
        })
    }
}

/// Request body for `POST /admin/triggers`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerBody {
    pub trigger: DomainTrigger,
    #[serde(default)]
    pub trigger_key: Option<String>,
}

/// GET /health
///
/// Unauthenticated. Returns 503 when the store is not healthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let storage = state
        .store
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
    let (code, status) = match &storage {
        HealthStatus::Healthy => (StatusCode::OK, "ok"),
        HealthStatus::Degraded(_) => (StatusCode::OK, "degraded"),
        HealthStatus::Unhealthy(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        storage,
    };
    (code, Json(body)).into_response()
}

/// GET /notifications?cursor=&limit=
pub async fn list_notifications(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> Result<Json<FeedPage>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;
    let cancel = state.shutdown.child_token();
    let page = state
        .reader
        .list_feed(
            identity.user_id,
            params.cursor.as_deref(),
            params.limit,
            &cancel,
        )
        .await?;
    Ok(Json(page))
}

/// GET /notifications/unread_count
pub async fn unread_count(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<CountResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let count = state.reader.unread_count(identity.user_id, &cancel).await?;
    Ok(Json(CountResponse { count }))
}

/// POST /notifications/{event_id}/read
pub async fn mark_read(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(event_id): Path<String>,
) -> Result<Json<MarkResult>, ApiError> {
    let event_id = EventId::from_str(&event_id)
        .map_err(|_| ApiError::validation(format!("invalid event id: {event_id}")))?;
    let cancel = state.shutdown.child_token();
    let result = state
        .reader
        .mark_read(identity.user_id, event_id, &cancel)
        .await?;
    Ok(Json(result))
}

/// POST /notifications/mark_all_read
pub async fn mark_all_read(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let updated = state.reader.mark_all_read(identity.user_id, &cancel).await?;
    Ok(Json(UpdatedResponse { updated }))
}

/// POST /admin/events
pub async fn post_event(
    State(state): State<GatewayState>,
    body: Result<Json<PublishBody>, JsonRejection>,
) -> Result<Json<PublishedResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let request = PublishRequest::try_from(body)?;
    let cancel = state.shutdown.child_token();
    let id = state.publisher.publish(request, &cancel).await?;
    Ok(Json(PublishedResponse { id }))
}

/// POST /admin/triggers
///
/// Always 200 once the body parses; per-recipient failures are in the report.
pub async fn post_trigger(
    State(state): State<GatewayState>,
    body: Result<Json<TriggerBody>, JsonRejection>,
) -> Result<Json<FanOutReport>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let cancel = state.shutdown.child_token();
    let report = state
        .dispatcher
        .fan_out(body.trigger, body.trigger_key.as_deref(), &cancel)
        .await;
    Ok(Json(report))
}
