// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker subprocess supervision (spec.md §4.6): spawn, IPC, idle timeout,
//! stderr capture. One [`ProcessManager::spawn`] call owns a worker's full
//! lifecycle — the scheduler awaits it directly rather than holding a
//! handle, the way `oj-adapters::subprocess::run_with_timeout` wraps a
//! single `Command::output()` in `tokio::time::timeout`.

use crate::config::{SpawnRequest, WORKER_CONFIG_ENV};
use crate::error::{ProcessError, Result};
use crate::ipc::IpcFrame;
use conclave_storage::registry;
use conclave_storage::Db;
use parking_lot::Mutex;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;

/// How long a politely-terminated worker gets before the hard kill.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Bytes of stderr retained for diagnostics, tail-truncated.
const DEFAULT_STDERR_CAPTURE_BYTES: usize = 4096;

/// Outcome of a worker's single turn.
#[derive(Debug, Clone, Default)]
pub struct WorkerOutcome {
    pub content: String,
}

pub struct ProcessManager {
    db: Db,
    idle_timeout: Duration,
    stderr_capture_bytes: usize,
}

impl ProcessManager {
    pub fn new(db: Db, idle_timeout: Duration) -> Self {
        Self {
            db,
            idle_timeout,
            stderr_capture_bytes: DEFAULT_STDERR_CAPTURE_BYTES,
        }
    }

    /// Spawn a worker and drive it to completion: result, error, exit, or
    /// idle timeout. Marks the worker row `running` with the new pid on
    /// spawn and clears it to `idle, pid=null` unconditionally on return.
    pub async fn spawn(&self, request: SpawnRequest, now_ms: i64) -> Result<WorkerOutcome> {
        let SpawnRequest {
            config,
            command,
            args,
            stdin_payload,
        } = request;
        let agent = config.agent.clone();
        let workflow = config.workflow.clone();
        let tag = config.tag.clone();
        let config_json = serde_json::to_string(&config)?;

        let mut child = Command::new(&command)
            .args(&args)
            .env(WORKER_CONFIG_ENV, config_json)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProcessError::SpawnFailed)?;

        let pid = child.id().ok_or_else(|| {
            ProcessError::SpawnFailed(std::io::Error::other(
                "child exited before a pid was observed",
            ))
        })?;
        registry::upsert_worker(self.db.pool(), &agent, &workflow, &tag, pid, now_ms).await?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Some(mut payload) = stdin_payload {
                payload.push('\n');
                let _ = stdin.write_all(payload.as_bytes()).await;
            }
            drop(stdin);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed(std::io::Error::other("missing stdout pipe")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessError::SpawnFailed(std::io::Error::other("missing stderr pipe")))?;

        let stderr_tail = Arc::new(Mutex::new(String::new()));
        tokio::spawn(capture_stderr_tail(
            stderr,
            Arc::clone(&stderr_tail),
            self.stderr_capture_bytes,
        ));

        let (frame_tx, mut frame_rx) = mpsc::channel(1);
        tokio::spawn(read_ipc_frames(stdout, frame_tx));

        let outcome = tokio::select! {
            frame = frame_rx.recv() => Self::finish_from_frame(frame, &mut child, &stderr_tail).await,
            status = child.wait() => finish_from_exit(status, &stderr_tail),
            _ = tokio::time::sleep(self.idle_timeout) => {
                terminate_politely(&mut child, pid, GRACE_PERIOD).await;
                Err(ProcessError::Timeout {
                    timeout_s: self.idle_timeout.as_secs(),
                    stderr_tail: stderr_tail.lock().clone(),
                })
            }
        };

        registry::clear_worker(self.db.pool(), &agent, &workflow, &tag).await?;
        outcome
    }

    async fn finish_from_frame(
        frame: Option<IpcFrame>,
        child: &mut Child,
        stderr_tail: &Arc<Mutex<String>>,
    ) -> Result<WorkerOutcome> {
        match frame {
            Some(IpcFrame::Result { data }) => Ok(WorkerOutcome {
                content: data.content,
            }),
            Some(IpcFrame::Error { error }) => Err(ProcessError::WorkerError(error)),
            // Stdout closed without a frame; the child still decides the outcome.
            None => finish_from_exit(child.wait().await, stderr_tail),
        }
    }

    /// Hard-kill an already-spawned worker out of band (e.g. scheduler
    /// shutdown). No-op if the worker row has no live pid.
    pub async fn kill(&self, agent: &str, workflow: &str, tag: &str) -> Result<()> {
        if let Some(worker) = registry::get_worker(self.db.pool(), agent, workflow, tag).await? {
            if let Some(pid) = worker.pid {
                let _ = nix::sys::signal::kill(
                    nix::unistd::Pid::from_raw(pid as i32),
                    nix::sys::signal::Signal::SIGKILL,
                );
            }
        }
        registry::clear_worker(self.db.pool(), agent, workflow, tag).await?;
        Ok(())
    }
}

fn finish_from_exit(
    status: std::io::Result<ExitStatus>,
    stderr_tail: &Arc<Mutex<String>>,
) -> Result<WorkerOutcome> {
    match status {
        Ok(status) if status.success() => Ok(WorkerOutcome::default()),
        Ok(status) => Err(ProcessError::NonZeroExit {
            code: status.code().unwrap_or(-1),
            stderr_tail: stderr_tail.lock().clone(),
        }),
        Err(e) => Err(e.into()),
    }
}

async fn terminate_politely(child: &mut Child, pid: u32, grace: Duration) {
    let _ = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid as i32),
        nix::sys::signal::Signal::SIGTERM,
    );
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        tracing::warn!(pid, "worker ignored SIGTERM, sending SIGKILL");
        let _ = child.kill().await;
    }
}

/// Read IPC frames from the worker's stdout, forwarding the first one and
/// then stopping — spec.md §4.6 only ever expects one terminal frame.
async fn read_ipc_frames(stdout: ChildStdout, tx: mpsc::Sender<IpcFrame>) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(frame) = serde_json::from_str::<IpcFrame>(&line) {
            let _ = tx.send(frame).await;
            return;
        }
        tracing::debug!(line, "ignoring non-IPC stdout line from worker");
    }
}

/// Capture stderr into a bounded, tail-truncated buffer for diagnostics.
async fn capture_stderr_tail(stderr: ChildStderr, buf: Arc<Mutex<String>>, limit: usize) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut guard = buf.lock();
        guard.push_str(&line);
        guard.push('\n');
        if guard.len() > limit {
            let excess = guard.len() - limit;
            guard.drain(0..excess);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
