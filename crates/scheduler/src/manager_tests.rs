// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::backend::BackendResolver;
use conclave_core::{AgentBackend, AgentState, Message, SendOptions, SystemClock};
use conclave_process::ProcessManager;
use conclave_storage::registry::CreateAgentInput;
use conclave_storage::{context, registry, Db};
use std::sync::Arc;
use std::time::Duration;

/// Always resolves to a fixed shell one-liner, ignoring the agent's actual
/// backend — lets tests exercise the scheduler without a real CLI binary.
struct ShellResolver {
    script: String,
}

impl BackendResolver for ShellResolver {
    fn resolve(&self, _agent: &conclave_core::AgentSpec) -> Result<(String, Vec<String>)> {
        Ok(("sh".to_string(), vec!["-c".to_string(), self.script.clone()]))
    }
}

fn gen_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

async fn new_manager(db: Db, resolver: Arc<dyn BackendResolver>) -> SchedulerManager {
    new_manager_with(db, resolver, Duration::from_millis(50), conclave_core::MAX_RETRIES).await
}

async fn new_manager_with(
    db: Db,
    resolver: Arc<dyn BackendResolver>,
    poll_interval: Duration,
    max_retries: u32,
) -> SchedulerManager {
    let process = ProcessManager::new(db.clone(), Duration::from_secs(5));
    SchedulerManager::new(
        db,
        process,
        resolver,
        Arc::new(SystemClock),
        "http://127.0.0.1:4455".into(),
        poll_interval,
        max_retries,
        conclave_core::RESOURCE_THRESHOLD,
    )
}

async fn create_agent(db: &Db, name: &str, backend: AgentBackend) {
    registry::create_agent(
        db.pool(),
        CreateAgentInput {
            name: name.into(),
            workflow: Some("review".into()),
            tag: Some("pr-1".into()),
            model: "gpt".into(),
            backend: Some(backend),
            ..Default::default()
        },
        1_000,
    )
    .await
    .unwrap();
}

async fn wait_for_message_from(db: &Db, sender: &str, timeout: Duration) -> Message {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let messages = context::channel_read(db.pool(), "review", "pr-1", context::ReadOptions::default())
            .await
            .unwrap();
        if let Some(message) = messages.iter().find(|m| m.sender == sender) {
            return message.clone();
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for a message from {sender}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn wait_until_idle(db: &Db, agent: &str, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let spec = registry::get_agent(db.pool(), agent, "review", "pr-1")
            .await
            .unwrap()
            .unwrap();
        if spec.state == AgentState::Idle {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("{agent} never returned to idle");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn start_on_non_empty_inbox_publishes_output_and_returns_to_idle() {
    let db = Db::open_in_memory().await.unwrap();
    create_agent(&db, "lead", AgentBackend::Mock).await;
    create_agent(&db, "scout", AgentBackend::Mock).await;
    context::channel_send(
        db.pool(),
        "lead",
        "please look at this",
        "review",
        "pr-1",
        SendOptions {
            to: Some("scout".into()),
            ..Default::default()
        },
        gen_id,
        1_000,
    )
    .await
    .unwrap();

    let resolver: Arc<dyn BackendResolver> = Arc::new(ShellResolver {
        script: r#"echo '{"type":"result","data":{"content":"ack"}}'"#.into(),
    });
    let manager = new_manager(db.clone(), resolver).await;

    manager.start("scout", "review", "pr-1").await;

    let message = wait_for_message_from(&db, "scout", Duration::from_secs(2)).await;
    assert_eq!(message.content, "ack");

    wait_until_idle(&db, "scout", Duration::from_secs(2)).await;
    assert!(manager.is_idle("scout", "review", "pr-1"));

    let remaining = context::inbox_query(db.pool(), "scout", "review", "pr-1")
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn stop_prevents_a_subsequent_start_from_ticking() {
    let db = Db::open_in_memory().await.unwrap();
    create_agent(&db, "lead", AgentBackend::Mock).await;
    create_agent(&db, "scout", AgentBackend::Mock).await;
    context::channel_send(
        db.pool(),
        "lead",
        "please look at this",
        "review",
        "pr-1",
        SendOptions {
            to: Some("scout".into()),
            ..Default::default()
        },
        gen_id,
        1_000,
    )
    .await
    .unwrap();

    let resolver: Arc<dyn BackendResolver> = Arc::new(ShellResolver {
        script: r#"echo '{"type":"result","data":{"content":"ack"}}'"#.into(),
    });
    let manager = new_manager(db.clone(), resolver).await;

    manager.stop("scout", "review", "pr-1").await;
    manager.start("scout", "review", "pr-1").await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    let messages = context::channel_read(db.pool(), "review", "pr-1", context::ReadOptions::default())
        .await
        .unwrap();
    assert!(messages.iter().all(|m| m.sender != "scout"));
}

#[tokio::test]
async fn unsupported_backend_retries_before_force_acking_the_inbox() {
    let db = Db::open_in_memory().await.unwrap();
    create_agent(&db, "lead", AgentBackend::Mock).await;
    create_agent(&db, "scout", AgentBackend::Claude).await;
    context::channel_send(
        db.pool(),
        "lead",
        "please look at this",
        "review",
        "pr-1",
        SendOptions {
            to: Some("scout".into()),
            ..Default::default()
        },
        gen_id,
        1_000,
    )
    .await
    .unwrap();

    let resolver: Arc<dyn BackendResolver> = Arc::new(MockBackendResolver::new("/bin/conclave-mock-worker"));
    let manager = new_manager_with(db.clone(), resolver, Duration::from_millis(150), 2).await;

    manager.start("scout", "review", "pr-1").await;

    // The very first turn fails immediately (no worker command for `claude`),
    // but the retry budget isn't exhausted yet — the inbox is left alone so
    // the same message gets retried on the next poll.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_first_failure = context::inbox_query(db.pool(), "scout", "review", "pr-1")
        .await
        .unwrap();
    assert!(
        !after_first_failure.is_empty(),
        "a single failed turn must not drop the inbox"
    );

    // The second failed turn reaches max_retries (2); only then is the
    // inbox force-acked so idle detection can still terminate.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let remaining = context::inbox_query(db.pool(), "scout", "review", "pr-1")
        .await
        .unwrap();
    assert!(remaining.is_empty(), "inbox is force-acked once max_retries is reached");
}

#[tokio::test]
async fn wake_ticks_an_idle_scheduler_with_pending_mail() {
    let db = Db::open_in_memory().await.unwrap();
    create_agent(&db, "lead", AgentBackend::Mock).await;
    create_agent(&db, "scout", AgentBackend::Mock).await;
    context::channel_send(
        db.pool(),
        "lead",
        "@scout please look",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        1_000,
    )
    .await
    .unwrap();

    let resolver: Arc<dyn BackendResolver> = Arc::new(ShellResolver {
        script: r#"echo '{"type":"result","data":{"content":"ack"}}'"#.into(),
    });
    let manager = new_manager(db.clone(), resolver).await;

    manager.wake("scout", "review", "pr-1").await;

    let message = wait_for_message_from(&db, "scout", Duration::from_secs(2)).await;
    assert_eq!(message.content, "ack");
}
