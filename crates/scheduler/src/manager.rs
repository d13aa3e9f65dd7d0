// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent scheduler state machine and its collection (spec.md §4.7).
//!
//! One logical scheduler per `(agent, workflow, tag)`: `idle` → `running`
//! → `idle`, or `stopped` at any point. There is no dedicated task per
//! agent; `tick`/`wake`/`start`/`stop` are plain async methods on the
//! shared [`SchedulerManager`], and a "running" scheduler is just an entry
//! whose state says so while its worker turn runs as a detached task — a
//! shared `Mutex<HashMap<_, _>>` driven from handler-style methods rather
//! than one long-lived task per worker.

use crate::backend::BackendResolver;
use crate::error::Result;
use conclave_core::{AgentSchedule, AgentState, Clock, SendOptions, UuidIdGen};
use conclave_process::{ProcessManager, SpawnRequest, WorkerConfig};
use conclave_storage::{context, registry, Db};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type Key = (String, String, String);

fn key(agent: &str, workflow: &str, tag: &str) -> Key {
    (agent.to_string(), workflow.to_string(), tag.to_string())
}

struct Entry {
    state: AgentState,
    retry_count: u32,
    poll_timer: Option<JoinHandle<()>>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: AgentState::Idle,
            retry_count: 0,
            poll_timer: None,
        }
    }
}

impl Entry {
    fn cancel_timer(&mut self) {
        if let Some(handle) = self.poll_timer.take() {
            handle.abort();
        }
    }
}

struct Inner {
    db: Db,
    process: ProcessManager,
    resolver: Arc<dyn BackendResolver>,
    clock: Arc<dyn Clock>,
    mcp_base_url: String,
    poll_interval: Duration,
    max_retries: u32,
    resource_threshold: usize,
    entries: Mutex<HashMap<Key, Entry>>,
}

/// Owns every agent's scheduler state; cheap to clone (an `Arc` handle).
#[derive(Clone)]
pub struct SchedulerManager {
    inner: Arc<Inner>,
}

impl SchedulerManager {
    pub fn new(
        db: Db,
        process: ProcessManager,
        resolver: Arc<dyn BackendResolver>,
        clock: Arc<dyn Clock>,
        mcp_base_url: String,
        poll_interval: Duration,
        max_retries: u32,
        resource_threshold: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                process,
                resolver,
                clock,
                mcp_base_url,
                poll_interval,
                max_retries,
                resource_threshold,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// `start()` — from `idle`, schedules an immediate tick. A no-op for an
    /// agent that is already running, stopped, or unknown-but-just-created
    /// (the latter starts `idle` by definition).
    pub async fn start(&self, agent: &str, workflow: &str, tag: &str) {
        let k = key(agent, workflow, tag);
        {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            if entry.state != AgentState::Idle {
                return;
            }
        }
        self.spawn_tick(k);
    }

    /// `stop()` — moves to `stopped` and clears any pending poll timer.
    /// Does not preempt an in-flight worker turn; its result is discarded.
    pub async fn stop(&self, agent: &str, workflow: &str, tag: &str) {
        let k = key(agent, workflow, tag);
        {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            entry.cancel_timer();
            entry.state = AgentState::Stopped;
        }
        let _ = registry::update_agent_state(
            self.inner.db.pool(),
            agent,
            workflow,
            tag,
            AgentState::Stopped,
        )
        .await;
    }

    /// Stop every scheduler and hard-kill every tracked worker (spec.md
    /// §4.11 shutdown). Best-effort: failures are swallowed.
    pub async fn stop_all(&self) {
        let keys: Vec<Key> = {
            let mut entries = self.inner.entries.lock();
            for entry in entries.values_mut() {
                entry.cancel_timer();
                entry.state = AgentState::Stopped;
            }
            entries.keys().cloned().collect()
        };
        for (agent, workflow, tag) in &keys {
            let _ = registry::update_agent_state(
                self.inner.db.pool(),
                agent,
                workflow,
                tag,
                AgentState::Stopped,
            )
            .await;
            let _ = self.inner.process.kill(agent, workflow, tag).await;
        }
    }

    /// `wake()` — a request to tick now. Clears the poll timer and invokes
    /// `tick` unless the scheduler is currently running (the running tick
    /// will loop back to poll when it finishes) or stopped.
    pub async fn wake(&self, agent: &str, workflow: &str, tag: &str) {
        let k = key(agent, workflow, tag);
        {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            if entry.state == AgentState::Stopped || entry.state == AgentState::Running {
                return;
            }
            entry.cancel_timer();
        }
        self.spawn_tick(k);
    }

    pub fn is_idle(&self, agent: &str, workflow: &str, tag: &str) -> bool {
        let entries = self.inner.entries.lock();
        entries
            .get(&key(agent, workflow, tag))
            .map(|e| e.state != AgentState::Running)
            .unwrap_or(true)
    }

    /// True once every scheduler registered under `(workflow, tag)` is not
    /// `running` (used by run-mode workflow completion detection).
    pub fn all_idle(&self, workflow: &str, tag: &str) -> bool {
        let entries = self.inner.entries.lock();
        entries
            .iter()
            .filter(|((_, w, t), _)| w == workflow && t == tag)
            .all(|(_, e)| e.state != AgentState::Running)
    }

    fn spawn_tick(&self, k: Key) {
        let mgr = self.clone();
        tokio::spawn(async move { Self::tick(mgr, k).await });
    }

    /// The core tick (spec.md §4.7). Tolerates database errors by bailing
    /// and retrying on the next tick, so shutdown-in-progress cannot crash
    /// a scheduler.
    async fn tick(mgr: SchedulerManager, k: Key) {
        let (agent, workflow, tag) = k.clone();
        {
            let mut entries = mgr.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            if entry.state == AgentState::Stopped || entry.state == AgentState::Running {
                return;
            }
            entry.cancel_timer();
        }

        let inbox = match context::inbox_query(mgr.inner.db.pool(), &agent, &workflow, &tag).await {
            Ok(inbox) => inbox,
            Err(error) => {
                tracing::warn!(%error, agent, "scheduler tick: inbox query failed, retrying next tick");
                mgr.arm_poll_timer(k).await;
                return;
            }
        };

        if inbox.is_empty() {
            mgr.arm_poll_timer(k).await;
            return;
        }

        {
            let mut entries = mgr.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            entry.state = AgentState::Running;
        }
        let _ = registry::update_agent_state(
            mgr.inner.db.pool(),
            &agent,
            &workflow,
            &tag,
            AgentState::Running,
        )
        .await;

        tokio::spawn(Self::run_worker_turn(mgr, k, inbox));
    }

    async fn run_worker_turn(mgr: SchedulerManager, k: Key, inbox: Vec<context::InboxEntry>) {
        let (agent, workflow, tag) = k.clone();
        let pool = mgr.inner.db.pool();
        let now_ms = mgr.inner.clock.epoch_ms();

        let spec = match registry::get_agent(pool, &agent, &workflow, &tag).await {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                tracing::warn!(agent, "scheduler tick: agent vanished mid-turn");
                mgr.finish_turn(k, Ok(None)).await;
                return;
            }
            Err(error) => {
                tracing::warn!(%error, agent, "scheduler tick: failed to load agent");
                mgr.finish_turn(k, Err(error.into())).await;
                return;
            }
        };

        let (command, args) = match mgr.inner.resolver.resolve(&spec) {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!(%error, agent, "scheduler tick: no worker command for backend");
                mgr.finish_turn(k, Err(error)).await;
                return;
            }
        };

        let kickoff = inbox
            .last()
            .map(|entry| entry.message.content.clone())
            .unwrap_or_default();
        let stdin_payload = serde_json::to_string(&serde_json::json!({ "content": kickoff })).ok();

        let config = WorkerConfig {
            agent: agent.clone(),
            workflow: workflow.clone(),
            tag: tag.clone(),
            mcp_url: format!("{}/mcp?agent={agent}", mgr.inner.mcp_base_url),
            mcp_servers: None,
        };
        let request = SpawnRequest {
            config,
            command,
            args,
            stdin_payload,
        };

        let result = mgr.inner.process.spawn(request, now_ms).await;
        match result {
            Ok(outcome) => mgr.finish_turn(k, Ok(Some(outcome.content))).await,
            Err(error) => mgr.finish_turn(k, Err(error.into())).await,
        }
    }

    /// Common tail of a worker turn: publish non-empty output, wake
    /// recipients, reset or bump the retry counter, and return to `idle`
    /// unless `stop()` raced us while the worker ran.
    ///
    /// The inbox is acked on a successful turn, and on a failed turn only
    /// once `bump_retry` reports `MAX_RETRIES` reached — short of that, the
    /// same inbox snapshot is retried on the next tick (spec.md §5).
    async fn finish_turn(&self, k: Key, result: Result<Option<String>>) {
        let (agent, workflow, tag) = k.clone();
        let pool = self.inner.db.pool();
        let now_ms = self.inner.clock.epoch_ms();

        let should_ack = match result {
            Ok(Some(content)) if !content.trim().is_empty() => {
                let gen_id = || UuidIdGen.next();
                let options = SendOptions {
                    resource_threshold: Some(self.inner.resource_threshold),
                    ..Default::default()
                };
                match context::channel_send(pool, &agent, &content, &workflow, &tag, options, gen_id, now_ms).await
                {
                    Ok(send_result) => {
                        for recipient in send_result.recipients {
                            self.wake(&recipient, &workflow, &tag).await;
                        }
                    }
                    Err(error) => tracing::warn!(%error, agent, "scheduler: failed to publish worker output"),
                }
                self.reset_retry(&k);
                true
            }
            Ok(_) => {
                self.reset_retry(&k);
                true
            }
            Err(error) => {
                tracing::warn!(%error, agent, "scheduler: worker turn failed");
                self.bump_retry(&k)
            }
        };

        if should_ack {
            let _ = context::inbox_ack_all(pool, &agent, &workflow, &tag).await;
        }

        let stopped = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(k.clone()).or_default();
            if entry.state == AgentState::Stopped {
                true
            } else {
                entry.state = AgentState::Idle;
                false
            }
        };
        if stopped {
            return;
        }
        let _ = registry::update_agent_state(pool, &agent, &workflow, &tag, AgentState::Idle).await;
        self.arm_poll_timer(k).await;
    }

    fn reset_retry(&self, k: &Key) {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get_mut(k) {
            entry.retry_count = 0;
        }
    }

    /// Bump the retry counter. Returns `true` once it reaches the
    /// configured `max_retries`, at which point the caller force-acks the
    /// inbox anyway, trading the dropped turn for terminating idle
    /// detection; the counter resets so the next message gets a fresh
    /// budget of attempts.
    fn bump_retry(&self, k: &Key) -> bool {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.get_mut(k) {
            entry.retry_count += 1;
            if entry.retry_count >= self.inner.max_retries {
                entry.retry_count = 0;
                return true;
            }
        }
        false
    }

    async fn arm_poll_timer(&self, k: Key) {
        let (agent, workflow, tag) = k.clone();
        let interval = match registry::get_agent(self.inner.db.pool(), &agent, &workflow, &tag).await {
            Ok(Some(spec)) => match spec.schedule {
                Some(AgentSchedule::Interval { seconds, .. }) => Duration::from_secs(seconds),
                _ => self.inner.poll_interval,
            },
            _ => self.inner.poll_interval,
        };

        let mgr = self.clone();
        let timer_key = k.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            Self::tick(mgr, timer_key).await;
        });

        let mut entries = self.inner.entries.lock();
        let entry = entries.entry(k).or_default();
        // stop()/wake() may have raced us while we awaited the agent lookup.
        if entry.state == AgentState::Stopped {
            handle.abort();
        } else {
            entry.cancel_timer();
            entry.poll_timer = Some(handle);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
