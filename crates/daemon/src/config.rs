// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (spec.md
//! §6, "Environment knobs").

use std::path::PathBuf;
use std::time::Duration;

use conclave_core::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WORKER_IDLE_TIMEOUT_S, MAX_RETRIES, RESOURCE_THRESHOLD,
};

/// Resolved daemon configuration, loaded once at startup from the
/// environment with documented fallbacks.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub worker_idle_timeout: Duration,
    pub max_retries: u32,
    pub resource_threshold: usize,
}

impl Config {
    pub fn load() -> Self {
        Self {
            data_dir: data_dir(),
            host: std::env::var("CONCLAVE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("CONCLAVE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            poll_interval: Duration::from_millis(
                std::env::var("CONCLAVE_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            worker_idle_timeout: Duration::from_secs(
                std::env::var("CONCLAVE_WORKER_IDLE_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_WORKER_IDLE_TIMEOUT_S),
            ),
            max_retries: std::env::var("CONCLAVE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_RETRIES),
            resource_threshold: std::env::var("CONCLAVE_RESOURCE_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(RESOURCE_THRESHOLD),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("conclave.db")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join("daemon.lock")
    }

    pub fn discovery_path(&self) -> PathBuf {
        self.data_dir.join("daemon.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("daemon.log")
    }
}

/// `CONCLAVE_DATA_DIR` > `dirs::data_dir()/conclave` > `./conclave-data`.
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONCLAVE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::data_dir() {
        Some(dir) => dir.join("conclave"),
        None => PathBuf::from("conclave-data"),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
