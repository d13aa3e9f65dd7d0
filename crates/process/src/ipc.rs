// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC wire format: one JSON object per line on the worker's stdout.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcFrame {
    Result { data: IpcResultData },
    Error { error: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpcResultData {
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
