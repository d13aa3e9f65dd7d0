// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves an agent's backend into a worker command line. Real CLI/SDK
//! backends (spec.md §4.2: `claude`, `codex`, `cursor`, `opencode`, `sdk`)
//! are out of the kernel's scope and are left to the host to wire in; the
//! kernel itself only ever drives the `mock` backend, standing in for a
//! live agent in tests and local development.

use crate::error::{Result, SchedulerError};
use conclave_core::{AgentBackend, AgentSpec};

/// Maps a registered agent to the command and arguments its worker turn
/// should spawn.
pub trait BackendResolver: Send + Sync {
    fn resolve(&self, agent: &AgentSpec) -> Result<(String, Vec<String>)>;
}

/// Resolver that only ever runs the in-tree mock worker binary.
pub struct MockBackendResolver {
    command: String,
}

impl MockBackendResolver {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl BackendResolver for MockBackendResolver {
    fn resolve(&self, agent: &AgentSpec) -> Result<(String, Vec<String>)> {
        match agent.backend {
            AgentBackend::Mock => Ok((self.command.clone(), Vec::new())),
            other => Err(SchedulerError::UnsupportedBackend(other.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
