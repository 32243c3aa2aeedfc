// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Libris notification service.
//!
//! Exposes the Reader API to authenticated users, admin endpoints for
//! publishing events and firing domain triggers, and an unauthenticated
//! health probe.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

use std::net::SocketAddr;

use async_trait::async_trait;
use libris_core::{HealthStatus, LibrisError, PluginAdapter};
use tokio::sync::Mutex;

pub use crate::auth::{AuthConfig, Identity, Role};
pub use crate::error::ApiError;
pub use crate::server::{GatewayState, ServerConfig, build_router};

/// The gateway HTTP server as a managed adapter.
///
/// `start` binds the socket and serves in a background task until the
/// state's shutdown token fires or `shutdown` is called.
pub struct Gateway {
    config: ServerConfig,
    state: GatewayState,
    server_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Gateway {
    pub fn new(config: ServerConfig, state: GatewayState) -> Self {
        Self {
            config,
            state,
            server_handle: Mutex::new(None),
        }
    }

    /// Bind and start serving. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, LibrisError> {
        let listener = server::bind(&self.config).await?;
        let addr = listener
            .local_addr()
            .map_err(|e| LibrisError::Internal(format!("gateway local address: {e}")))?;

        let router = build_router(self.state.clone());
        let shutdown = self.state.shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve(listener, router, shutdown).await {
                tracing::error!(error = %e, "gateway server error");
            }
        });
        *self.server_handle.lock().await = Some(handle);

        tracing::info!(%addr, "gateway started");
        Ok(addr)
    }
}

#[async_trait]
impl PluginAdapter for Gateway {
    fn name(&self) -> &str {
        "gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, LibrisError> {
        match self.server_handle.lock().await.as_ref() {
            Some(handle) if !handle.is_finished() => Ok(HealthStatus::Healthy),
            Some(_) => Ok(HealthStatus::Unhealthy("server stopped".to_string())),
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
        }
    }

    /// Waits for in-flight requests to drain after the shutdown token fires.
    async fn shutdown(&self) -> Result<(), LibrisError> {
        self.state.shutdown.cancel();
        if let Some(handle) = self.server_handle.lock().await.take() {
            handle
                .await
                .map_err(|e| LibrisError::Internal(format!("gateway task failed: {e}")))?;
        }
        Ok(())
    }
}
