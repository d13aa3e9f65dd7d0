// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! conclave-process: worker subprocess lifecycle (spec.md §4.6).
//!
//! A [`manager::ProcessManager`] spawns one subprocess per worker turn,
//! carries its [`config::WorkerConfig`] through the environment, and
//! reads its single terminal [`ipc::IpcFrame`] off stdout — a narrow
//! supervision surface in the same spirit as an `AgentAdapter` trait
//! wrapping a CLI agent process.

pub mod config;
pub mod error;
pub mod ipc;
pub mod manager;

pub use config::{SpawnRequest, WorkerConfig, WORKER_CONFIG_ENV};
pub use error::{ProcessError, Result};
pub use ipc::{IpcFrame, IpcResultData};
pub use manager::{ProcessManager, WorkerOutcome};
