// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel message: the append-only unit of the context store.

use crate::scope::Scope;
use crate::MessageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    ToolCall,
    System,
    Output,
    Debug,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::ToolCall => "tool_call",
            MessageKind::System => "system",
            MessageKind::Output => "output",
            MessageKind::Debug => "debug",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(Self::Message),
            "tool_call" => Some(Self::ToolCall),
            "system" => Some(Self::System),
            "output" => Some(Self::Output),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Message
    }
}

/// Metadata describing the tool call a `ToolCall`-kind message records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMeta {
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// A single append-only channel entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Monotonic per-database sequence number assigned at insert (SQLite rowid).
    pub sequence: i64,
    pub sender: String,
    pub scope: Scope,
    pub content: String,
    pub recipients: Vec<String>,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at_ms: i64,
}

/// Priority computed for a message surfaced through an agent's inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
}

/// Options accepted by `channel.send`.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Direct-message target. When set, overrides mention-derived recipients.
    pub to: Option<String>,
    /// When true, the message is delivered verbatim regardless of length
    /// (kickoff/system messages).
    pub skip_auto_resource: bool,
    pub kind: Option<MessageKind>,
    pub tool_call: Option<ToolCallMeta>,
    pub metadata: Option<serde_json::Value>,
    /// Overrides [`crate::RESOURCE_THRESHOLD`] for this send. `None` uses
    /// the kernel default.
    pub resource_threshold: Option<usize>,
}

#[allow(clippy::expect_used)]
static URGENT_PATTERN: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"(?i)\b(urgent|asap|blocked|critical)\b")
        .expect("constant regex pattern is valid")
});

/// Urgent keywords that upgrade a message's inbox priority to `high`, even
/// for a single-recipient (non-broadcast) message.
pub fn is_urgent(content: &str) -> bool {
    URGENT_PATTERN.is_match(content)
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
