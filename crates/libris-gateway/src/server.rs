// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use libris_core::{EventStore, LibrisError};
use libris_notify::{Dispatcher, Publisher, Reader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware, require_admin};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub reader: Arc<Reader>,
    pub publisher: Arc<Publisher>,
    pub dispatcher: Arc<Dispatcher>,
    /// Probed by the health endpoint.
    pub store: Arc<dyn EventStore>,
    pub auth: AuthConfig,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from libris-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the application router.
///
/// - `GET /health` (no auth)
/// - `GET /notifications`, `GET /notifications/unread_count`,
///   `POST /notifications/{event_id}/read`, `POST /notifications/mark_all_read`
/// - `POST /admin/events`, `POST /admin/triggers` (admin role)
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/events", post(handlers::post_event))
        .route("/admin/triggers", post(handlers::post_trigger))
        .route_layer(axum_middleware::from_fn(require_admin));

    let api_routes = Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/unread_count", get(handlers::unread_count))
        .route("/notifications/mark_all_read", post(handlers::mark_all_read))
        .route("/notifications/{event_id}/read", post(handlers::mark_read))
        .merge(admin_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listening socket.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, LibrisError> {
    let addr = format!("{}:{}", config.host, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| LibrisError::Internal(format!("failed to bind gateway to {addr}: {e}")))
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), LibrisError> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(addr = ?addr, "gateway server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| LibrisError::Internal(format!("gateway server error: {e}")))
}
