// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration handed to a spawned worker, serialised into its
//! environment (spec.md §4.6).

use serde::{Deserialize, Serialize};

/// Environment variable the worker reads its [`WorkerConfig`] from.
pub const WORKER_CONFIG_ENV: &str = "CONCLAVE_WORKER_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub agent: String,
    pub workflow: String,
    pub tag: String,
    /// Daemon MCP URL, carrying the agent name as a query parameter
    /// (`http://127.0.0.1:<port>/mcp?agent=<name>`).
    pub mcp_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Vec<String>>,
}

/// What to spawn and how long to let it run before the idle-timeout fires.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub config: WorkerConfig,
    pub command: String,
    pub args: Vec<String>,
    /// Payload written as one JSON line to the child's stdin at spawn time
    /// (the mock backend's kickoff content; real backends ignore it or use
    /// their own stdin protocol).
    pub stdin_payload: Option<String>,
}
