// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("backend {0} has no kernel-provided worker command")]
    UnsupportedBackend(String),
    #[error(transparent)]
    Storage(#[from] conclave_storage::StorageError),
    #[error(transparent)]
    Process(#[from] conclave_process::ProcessError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
