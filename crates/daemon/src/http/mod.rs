// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/JSON-RPC surface (spec.md §4.8/§4.9): REST endpoints for the CLI
//! host plus the `/mcp` tool dispatcher workers call.

pub mod rest;
pub mod rpc;

use conclave_core::Clock;
use conclave_scheduler::SchedulerManager;
use conclave_storage::{documents::DocumentProvider, Db};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;

/// Dependency bundle every handler closes over (spec.md §4.11). The
/// scheduler manager starts absent and is injected once the process
/// manager is constructed, after the HTTP server is already bound and
/// accepting requests.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
    pub shutdown: Arc<Notify>,
    pub scheduler: Arc<RwLock<Option<SchedulerManager>>>,
    pub documents: Option<Arc<DocumentProvider>>,
    /// `CONCLAVE_RESOURCE_THRESHOLD` (spec.md §6), applied to every
    /// `channel.send` this daemon handles.
    pub resource_threshold: usize,
}

impl AppState {
    pub fn scheduler(&self) -> Option<SchedulerManager> {
        self.scheduler.read().clone()
    }

    pub fn set_scheduler(&self, manager: SchedulerManager) {
        *self.scheduler.write() = Some(manager);
    }

    /// Wake every recipient's scheduler after a `channel.send`, whether the
    /// send came in over `/send` or a worker's `channel_send` tool call —
    /// the HTTP layer is the only caller that performs fan-out (spec.md §9).
    pub async fn wake_all(&self, workflow: &str, tag: &str, recipients: &[String]) {
        if let Some(scheduler) = self.scheduler() {
            for recipient in recipients {
                scheduler.wake(recipient, workflow, tag).await;
            }
        }
    }
}

pub fn router(state: AppState) -> axum::Router {
    axum::Router::new()
        .merge(rest::routes())
        .merge(rpc::routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
