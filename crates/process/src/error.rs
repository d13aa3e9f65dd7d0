// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-supervision error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(std::io::Error),
    #[error("worker reported error: {0}")]
    WorkerError(String),
    #[error("worker timed out after {timeout_s}s")]
    Timeout { timeout_s: u64, stderr_tail: String },
    #[error("worker exited with status {code}: {stderr_tail}")]
    NonZeroExit { code: i32, stderr_tail: String },
    #[error("storage error: {0}")]
    Storage(#[from] conclave_storage::StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed ipc frame: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
