// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `libris serve` command implementation.
//!
//! Opens SQLite storage, wires the publisher, fan-out dispatcher and reader
//! over the SQLite directory read model, then runs the HTTP gateway and the
//! borrow reminder sweep until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Instant;

use libris_config::model::LibrisConfig;
use libris_core::time::SystemClock;
use libris_core::{Clock, EventStore, LibrisError, PluginAdapter};
use libris_gateway::{AuthConfig, Gateway, GatewayState, ServerConfig};
use libris_notify::{Dispatcher, Publisher, Reader, ReminderSweep};
use libris_storage::{SqliteDirectory, SqliteStorage};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::shutdown;

/// Every long-lived service, sharing one store and one clock.
pub(crate) struct Services {
    pub storage: Arc<SqliteStorage>,
    pub publisher: Arc<Publisher>,
    pub dispatcher: Arc<Dispatcher>,
    pub reader: Arc<Reader>,
}

impl Services {
    /// Open storage (running migrations) and build the services on top.
    pub(crate) async fn open(config: &LibrisConfig) -> Result<Self, LibrisError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let directory = Arc::new(SqliteDirectory::new(storage.database()?.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        let publisher = Arc::new(Publisher::new(
            storage.clone(),
            directory.clone(),
            clock.clone(),
            config.publisher.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            publisher.clone(),
            directory.clone(),
            directory.clone(),
            clock.clone(),
            config.fanout.clone(),
        ));
        let reader = Arc::new(Reader::new(
            storage.clone(),
            directory,
            clock,
            config.reader.clone(),
        ));

        Ok(Self {
            storage,
            publisher,
            dispatcher,
            reader,
        })
    }

    fn gateway_state(&self, config: &LibrisConfig, shutdown: CancellationToken) -> GatewayState {
        GatewayState {
            reader: self.reader.clone(),
            publisher: self.publisher.clone(),
            dispatcher: self.dispatcher.clone(),
            store: self.storage.clone(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            shutdown,
            start_time: Instant::now(),
        }
    }
}

/// Runs the `libris serve` command.
///
/// Returns once a shutdown signal has been handled, the gateway has drained
/// and the WAL has been checkpointed.
pub async fn run_serve(config: LibrisConfig) -> Result<(), LibrisError> {
    info!(name = %config.service.name, "starting libris serve");

    let services = Services::open(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let reminder_task = if config.reminders.enabled {
        let sweep = Arc::new(ReminderSweep::new(
            services.dispatcher.clone(),
            Arc::new(SystemClock::new()),
            config.reminders.clone(),
        ));
        info!(
            interval_secs = config.reminders.interval_secs,
            horizon_hours = config.reminders.due_soon_horizon_hours,
            overdue = config.reminders.overdue_enabled,
            "reminder sweep enabled"
        );
        Some(tokio::spawn(sweep.run(cancel.clone())))
    } else {
        info!("reminder sweep disabled");
        None
    };

    let gateway = if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set -- every request will be rejected");
        }
        let gateway = Gateway::new(
            ServerConfig {
                host: config.gateway.host.clone(),
                port: config.gateway.port,
            },
            services.gateway_state(&config, cancel.clone()),
        );
        gateway.start().await?;
        Some(gateway)
    } else {
        warn!("gateway disabled -- only the reminder sweep will run");
        None
    };

    cancel.cancelled().await;
    info!("shutdown requested, draining");

    if let Some(gateway) = gateway {
        if let Err(e) = gateway.shutdown().await {
            error!(error = %e, "gateway shutdown failed");
        }
    }
    if let Some(task) = reminder_task {
        if let Err(e) = task.await {
            error!(error = %e, "reminder task failed");
        }
    }

    services.storage.shutdown().await?;
    info!("libris stopped");
    Ok(())
}
