// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use libris_core::{ErrorKind, LibrisError};
use serde::Serialize;

/// Error response body: `{ "error": "<kind>", "detail": "<message>" }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A handler failure rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub LibrisError);

impl From<LibrisError> for ApiError {
    fn from(err: LibrisError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self(LibrisError::Validation(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::UnknownUser | ErrorKind::EventNotFound => StatusCode::NOT_FOUND,
            ErrorKind::NotVisible => StatusCode::FORBIDDEN,
            ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.0.kind();
        // Store failures are logged, not echoed to the caller.
        let detail = match &self.0 {
            LibrisError::Storage { .. } | LibrisError::Internal(_) => {
                tracing::error!(error = %self.0, "request failed");
                None
            }
            other => Some(other.to_string()),
        };
        let body = ErrorBody {
            error: kind.to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}
