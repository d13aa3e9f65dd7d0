// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level error taxonomy: lifecycle/startup failures and the HTTP
//! error envelope (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a data directory")]
    NoDataDir,
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),
    #[error("failed to bind {0}:{1}: {2}")]
    BindFailed(String, u16, std::io::Error),
    #[error(transparent)]
    Storage(#[from] conclave_storage::StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by HTTP handlers and the JSON-RPC tool dispatcher,
/// mapped to REST status codes / JSON-RPC error codes (spec.md §7).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<conclave_storage::StorageError> for HttpError {
    fn from(err: conclave_storage::StorageError) -> Self {
        match err {
            conclave_storage::StorageError::NotFound(msg) => HttpError::NotFound(msg),
            conclave_storage::StorageError::Duplicate(msg) => HttpError::Conflict(msg),
            conclave_storage::StorageError::Validation(msg) => HttpError::Validation(msg),
            other => HttpError::Internal(other.to_string()),
        }
    }
}

impl From<conclave_scheduler::SchedulerError> for HttpError {
    fn from(err: conclave_scheduler::SchedulerError) -> Self {
        match err {
            conclave_scheduler::SchedulerError::Storage(inner) => inner.into(),
            other => HttpError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Conflict(_) => StatusCode::CONFLICT,
            HttpError::Validation(_) => StatusCode::BAD_REQUEST,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
pub type HttpResult<T> = std::result::Result<T, HttpError>;
