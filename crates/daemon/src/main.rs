// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! conclaved: the conclave kernel daemon.
//!
//! Owns the agent registry, context store, scheduler, and worker process
//! pool, and exposes them over a local HTTP/JSON-RPC surface. Not meant to
//! be invoked directly by end users — a CLI or orchestrator starts it and
//! talks to it over the discovery file's `host:port`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use conclave_daemon::error::LifecycleError;
use conclave_daemon::{Config, Daemon};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("conclaved {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("conclaved {}", env!("CARGO_PKG_VERSION"));
                println!("conclave kernel daemon");
                println!();
                println!("USAGE:");
                println!("    conclaved");
                println!();
                println!("conclaved is typically started by an orchestrator and should not");
                println!("be invoked directly. It listens on a local TCP port for the REST");
                println!("and JSON-RPC (MCP) surfaces and writes its address to the discovery");
                println!("file in the data directory.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: conclaved [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();

    rotate_log_if_needed(&config.log_path());
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting conclave daemon");

    let backend_command = std::env::var("CONCLAVE_BACKEND_COMMAND")
        .unwrap_or_else(|_| "conclave-worker".to_string());

    let daemon = match Daemon::start(config.clone(), backend_command).await {
        Ok(d) => d,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("conclaved is already running against {}", config.data_dir.display());
            let discovery_path = config.discovery_path();
            if let Some(record) = conclave_daemon::discovery::read(&discovery_path) {
                eprintln!("  pid: {}", record.pid);
                eprintln!("  address: {}:{}", record.host, record.port);
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready, listening on {}", daemon.local_addr);
    println!("READY");

    let shutdown = daemon.state.shutdown.clone();

    tokio::select! {
        _ = shutdown.notified() => {
            info!("shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down...");
        }
    }

    daemon.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- conclaved: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write a startup error synchronously to the log file so it's visible to
/// the caller even if the process exits before the async tracing writer
/// flushes.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_path();
    let parent = log_path.parent().ok_or(LifecycleError::NoDataDir)?;
    std::fs::create_dir_all(parent)?;

    let file_name = log_path.file_name().ok_or(LifecycleError::NoDataDir)?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
