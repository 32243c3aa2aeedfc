// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Libris - event and notification fan-out service.
//!
//! This is the binary entry point for the Libris service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use libris_config::{ConfigError, LibrisConfig};

/// Libris - event and notification fan-out service.
#[derive(Parser, Debug)]
#[command(name = "libris", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway and the reminder sweep until interrupted.
    Serve,
    /// Validate configuration and open the database.
    Check,
    /// Apply pending database migrations and exit.
    Migrate,
}

fn load_config(path: Option<&PathBuf>) -> Result<LibrisConfig, Vec<ConfigError>> {
    match path {
        Some(path) => libris_config::load_and_validate_path(path),
        None => libris_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            libris_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.service.log_level);

    let outcome = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Check => {
            return if check::run_check(&config).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
        }
        Commands::Migrate => check::run_migrate(&config).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "libris exited with an error");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG`, when set, replaces the configured level entirely.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("libris={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
