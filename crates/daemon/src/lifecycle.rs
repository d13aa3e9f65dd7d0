// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup and shutdown sequencing (spec.md §4.11).
//!
//! Startup order matters: the lock file is acquired before anything else
//! so two daemons racing for the same data directory fail fast, and the
//! HTTP listener binds only after the database is open and migrated.

use crate::config::Config;
use crate::discovery;
use crate::error::{LifecycleError, LifecycleResult};
use crate::http::{router, AppState};
use conclave_core::{Clock, SystemClock};
use conclave_scheduler::{MockBackendResolver, SchedulerManager};
use conclave_storage::documents::DocumentProvider;
use conclave_storage::{registry, Db};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::File;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// A running daemon: the dependency bundle handlers use plus the join
/// handles needed to drive shutdown.
pub struct Daemon {
    pub state: AppState,
    pub local_addr: std::net::SocketAddr,
    _lock_file: File,
    server: JoinHandle<()>,
    config: Config,
}

impl Daemon {
    /// Startup sequence (spec.md §4.11): open database → ensure global
    /// workflow → construct shutdown closure → build HTTP app → start
    /// server → construct process manager → construct scheduler manager →
    /// inject it into the HTTP dependencies → write the discovery file.
    pub async fn start(config: Config, backend_command: String) -> LifecycleResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(config.lock_path())?;
        lock_file
            .try_lock_exclusive()
            .map_err(LifecycleError::LockFailed)?;

        let db = Db::open(&config.db_path()).await?;
        let now_ms = SystemClock.epoch_ms();
        registry::ensure_global_workflow(db.pool(), now_ms).await?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let shutdown = Arc::new(Notify::new());
        let scheduler_slot = Arc::new(RwLock::new(None));
        let documents = Some(Arc::new(DocumentProvider::new(config.data_dir.join("documents"))));

        let state = AppState {
            db: db.clone(),
            clock: clock.clone(),
            started_at: std::time::Instant::now(),
            shutdown: shutdown.clone(),
            scheduler: scheduler_slot.clone(),
            documents,
            resource_threshold: config.resource_threshold,
        };

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| LifecycleError::BindFailed(config.host.clone(), config.port, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| LifecycleError::BindFailed(config.host.clone(), config.port, e))?;

        let app = router(state.clone());
        let shutdown_signal = shutdown.clone();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown_signal.notified().await })
                .await;
        });

        let process = conclave_process::ProcessManager::new(db.clone(), config.worker_idle_timeout);
        let resolver = Arc::new(MockBackendResolver::new(backend_command));
        let mcp_base_url = format!("http://{local_addr}");
        let manager = SchedulerManager::new(
            db.clone(),
            process,
            resolver,
            clock,
            mcp_base_url,
            config.poll_interval,
            config.max_retries,
            config.resource_threshold,
        );
        state.set_scheduler(manager);

        discovery::write(
            &config.discovery_path(),
            &discovery::DiscoveryRecord {
                pid: std::process::id(),
                host: config.host.clone(),
                port: local_addr.port(),
                started_at_ms: now_ms,
            },
        )?;

        tracing::info!(%local_addr, data_dir = %config.data_dir.display(), "daemon started");

        Ok(Self {
            state,
            local_addr,
            _lock_file: lock_file,
            server,
            config,
        })
    }

    /// Idempotent shutdown (spec.md §4.11): stop every scheduler, kill
    /// every worker, stop the HTTP server, close the database, unlink the
    /// discovery file. Every step is best-effort so the process always
    /// terminates.
    pub async fn shutdown(self) {
        if let Some(manager) = self.state.scheduler() {
            manager.stop_all().await;
        }
        self.state.shutdown.notify_one();
        let _ = self.server.await;
        self.state.db.close().await;
        discovery::remove(&self.config.discovery_path());
        tracing::info!("daemon shutdown complete");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
