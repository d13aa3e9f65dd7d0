// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent registration: the data the registry persists and the scheduler
//! and process manager read.

use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime state of a registered agent. Mutated only by the owning
/// scheduler, except for the explicit delete path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Idle => write!(f, "idle"),
            AgentState::Running => write!(f, "running"),
            AgentState::Stopped => write!(f, "stopped"),
        }
    }
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Running => "running",
            AgentState::Stopped => "stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// Which worker backend executes this agent's turns. The concrete command
/// line for each variant is assembled by the out-of-scope CLI/backend
/// layer; the kernel only ever stores and forwards the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentBackend {
    Sdk,
    Claude,
    Codex,
    Cursor,
    Opencode,
    Mock,
}

impl Default for AgentBackend {
    fn default() -> Self {
        Self::Sdk
    }
}

impl fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentBackend::Sdk => "sdk",
            AgentBackend::Claude => "claude",
            AgentBackend::Codex => "codex",
            AgentBackend::Cursor => "cursor",
            AgentBackend::Opencode => "opencode",
            AgentBackend::Mock => "mock",
        };
        write!(f, "{s}")
    }
}

impl AgentBackend {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "sdk" => Self::Sdk,
            "claude" => Self::Claude,
            "codex" => Self::Codex,
            "cursor" => Self::Cursor,
            "opencode" => Self::Opencode,
            "mock" => Self::Mock,
            _ => return None,
        })
    }
}

/// Optional provider override for a non-default model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Reference to an externally-held API key (never the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_ref: Option<String>,
}

/// An agent's wake-up schedule: either a fixed interval or a cron
/// expression, each with an optional prompt to post on fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentSchedule {
    Interval {
        seconds: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    Cron {
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
}

/// Full agent registration as the registry stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub scope: Scope,
    pub model: String,
    #[serde(default)]
    pub backend: AgentBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<AgentSchedule>,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default = "default_state")]
    pub state: AgentState,
    pub created_at_ms: i64,
}

fn default_state() -> AgentState {
    AgentState::Idle
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
