// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST endpoints (spec.md §4.8): agent/workflow CRUD, channel send/peek,
//! health and shutdown. Loopback-only, all bodies JSON.

use super::AppState;
use crate::error::{HttpError, HttpResult};
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use conclave_core::{AgentSchedule, AgentSpec, Clock, ProviderConfig, SendOptions};
use conclave_storage::{context, registry};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/shutdown", post(shutdown))
        .route("/agents", post(create_agent).get(list_agents))
        .route("/agents/{name}", get(get_agent).delete(delete_agent))
        .route("/send", post(send))
        .route("/peek", get(peek))
        .route("/workflows", post(create_workflow).get(list_workflows))
        .route("/workflows/{workflow}/{tag}/status", get(workflow_status))
        .route("/workflows/{workflow}/{tag}", delete(delete_workflow))
}

#[derive(Serialize)]
struct HealthResponse {
    pid: u32,
    uptime_s: u64,
    agents: usize,
}

async fn health(State(state): State<AppState>) -> HttpResult<Json<HealthResponse>> {
    let agents = registry::list_agents(state.db.pool(), None, None).await?;
    Ok(Json(HealthResponse {
        pid: std::process::id(),
        uptime_s: state.started_at.elapsed().as_secs(),
        agents: agents.len(),
    }))
}

async fn shutdown(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.shutdown.notify_one();
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Deserialize)]
struct CreateAgentBody {
    name: String,
    workflow: Option<String>,
    tag: Option<String>,
    model: String,
    backend: Option<conclave_core::AgentBackend>,
    system_prompt: Option<String>,
    provider: Option<ProviderConfig>,
    schedule: Option<AgentSchedule>,
    config: Option<serde_json::Value>,
}

async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<CreateAgentBody>,
) -> HttpResult<Json<AgentSpec>> {
    let now_ms = state.clock.epoch_ms();
    let input = registry::CreateAgentInput {
        name: body.name,
        workflow: body.workflow,
        tag: body.tag,
        model: body.model,
        backend: body.backend,
        system_prompt: body.system_prompt,
        provider: body.provider,
        schedule: body.schedule,
        config: body.config,
    };
    let agent = registry::create_agent(state.db.pool(), input, now_ms).await?;
    if let Some(scheduler) = state.scheduler() {
        scheduler.start(&agent.name, &agent.scope.workflow, &agent.scope.tag).await;
    }
    Ok(Json(agent))
}

#[derive(Deserialize)]
struct ScopeQuery {
    workflow: Option<String>,
    tag: Option<String>,
}

async fn list_agents(
    State(state): State<AppState>,
    Query(q): Query<ScopeQuery>,
) -> HttpResult<Json<Vec<AgentSpec>>> {
    let agents = registry::list_agents(state.db.pool(), q.workflow.as_deref(), q.tag.as_deref()).await?;
    Ok(Json(agents))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<ScopeQuery>,
) -> HttpResult<Json<AgentSpec>> {
    let workflow = q.workflow.as_deref().unwrap_or(conclave_core::scope::GLOBAL_WORKFLOW);
    let tag = q.tag.as_deref().unwrap_or(conclave_core::scope::MAIN_TAG);
    let agent = registry::get_agent(state.db.pool(), &name, workflow, tag)
        .await?
        .ok_or_else(|| HttpError::NotFound(format!("agent {name}")))?;
    Ok(Json(agent))
}

async fn delete_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<ScopeQuery>,
) -> HttpResult<Json<serde_json::Value>> {
    let workflow = q.workflow.as_deref().unwrap_or(conclave_core::scope::GLOBAL_WORKFLOW);
    let tag = q.tag.as_deref().unwrap_or(conclave_core::scope::MAIN_TAG);
    if let Some(scheduler) = state.scheduler() {
        scheduler.stop(&name, workflow, tag).await;
    }
    registry::remove_agent(state.db.pool(), &name, workflow, tag).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Deserialize)]
struct SendBody {
    sender: String,
    content: String,
    workflow: Option<String>,
    tag: Option<String>,
    to: Option<String>,
    skip_auto_resource: Option<bool>,
}

#[derive(Serialize)]
struct SendResponse {
    id: String,
    recipients: Vec<String>,
}

async fn send(State(state): State<AppState>, Json(body): Json<SendBody>) -> HttpResult<Json<SendResponse>> {
    let workflow = body.workflow.unwrap_or_else(|| conclave_core::scope::GLOBAL_WORKFLOW.to_string());
    let tag = body.tag.unwrap_or_else(|| conclave_core::scope::MAIN_TAG.to_string());
    let now_ms = state.clock.epoch_ms();
    let options = SendOptions {
        to: body.to,
        skip_auto_resource: body.skip_auto_resource.unwrap_or(false),
        resource_threshold: Some(state.resource_threshold),
        ..Default::default()
    };
    let result = context::channel_send(
        state.db.pool(),
        &body.sender,
        &body.content,
        &workflow,
        &tag,
        options,
        || conclave_core::UuidIdGen.next(),
        now_ms,
    )
    .await?;
    state.wake_all(&workflow, &tag, &result.recipients).await;
    Ok(Json(SendResponse {
        id: result.id.to_string(),
        recipients: result.recipients,
    }))
}

#[derive(Deserialize)]
struct PeekQuery {
    workflow: Option<String>,
    tag: Option<String>,
    since: Option<String>,
    limit: Option<usize>,
    agent: Option<String>,
}

async fn peek(
    State(state): State<AppState>,
    Query(q): Query<PeekQuery>,
) -> HttpResult<Json<Vec<conclave_core::Message>>> {
    let workflow = q.workflow.unwrap_or_else(|| conclave_core::scope::GLOBAL_WORKFLOW.to_string());
    let tag = q.tag.unwrap_or_else(|| conclave_core::scope::MAIN_TAG.to_string());
    let options = context::ReadOptions {
        since: q.since.map(conclave_core::MessageId::new),
        limit: q.limit,
        agent: q.agent,
    };
    let messages = context::channel_read(state.db.pool(), &workflow, &tag, options).await?;
    Ok(Json(messages))
}

#[derive(Deserialize)]
struct CreateWorkflowAgent {
    name: String,
    model: String,
    backend: Option<conclave_core::AgentBackend>,
    system_prompt: Option<String>,
    provider: Option<ProviderConfig>,
    schedule: Option<AgentSchedule>,
    config: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CreateWorkflowBody {
    name: String,
    tag: Option<String>,
    config: Option<serde_json::Value>,
    agents: Vec<CreateWorkflowAgent>,
    kickoff: Option<String>,
    skip_auto_resource: Option<bool>,
}

#[derive(Serialize)]
struct CreateWorkflowResponse {
    workflow: conclave_core::Workflow,
    agents: Vec<AgentSpec>,
}

/// Create a workflow, its agents, start their schedulers, and optionally
/// inject a kickoff message (spec.md §4.8) before waking the recipients it
/// names.
async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkflowBody>,
) -> HttpResult<Json<CreateWorkflowResponse>> {
    let now_ms = state.clock.epoch_ms();
    let tag = body.tag.unwrap_or_else(|| conclave_core::scope::MAIN_TAG.to_string());
    let workflow = registry::create_workflow(state.db.pool(), &body.name, &tag, body.config, now_ms).await?;

    let mut agents = Vec::with_capacity(body.agents.len());
    for a in body.agents {
        let input = registry::CreateAgentInput {
            name: a.name,
            workflow: Some(body.name.clone()),
            tag: Some(tag.clone()),
            model: a.model,
            backend: a.backend,
            system_prompt: a.system_prompt,
            provider: a.provider,
            schedule: a.schedule,
            config: a.config,
        };
        agents.push(registry::create_agent(state.db.pool(), input, now_ms).await?);
    }

    if let Some(scheduler) = state.scheduler() {
        for agent in &agents {
            scheduler.start(&agent.name, &body.name, &tag).await;
        }
    }

    if let Some(kickoff) = body.kickoff {
        let options = SendOptions {
            skip_auto_resource: body.skip_auto_resource.unwrap_or(true),
            resource_threshold: Some(state.resource_threshold),
            ..Default::default()
        };
        let result = context::channel_send(
            state.db.pool(),
            "system",
            &kickoff,
            &body.name,
            &tag,
            options,
            || conclave_core::UuidIdGen.next(),
            now_ms,
        )
        .await?;
        state.wake_all(&body.name, &tag, &result.recipients).await;
    }

    Ok(Json(CreateWorkflowResponse { workflow, agents }))
}

async fn list_workflows(State(state): State<AppState>) -> HttpResult<Json<Vec<conclave_core::Workflow>>> {
    Ok(Json(registry::list_workflows(state.db.pool()).await?))
}

#[derive(Serialize)]
struct WorkflowStatus {
    workflow: String,
    tag: String,
    agent_count: usize,
    all_idle: bool,
    pending_inbox: bool,
    complete: bool,
}

/// `complete ⇔ allIdle ∧ ¬pendingInbox ∧ agentCount > 0` (spec.md §8).
async fn workflow_status(
    State(state): State<AppState>,
    Path((workflow, tag)): Path<(String, String)>,
) -> HttpResult<Json<WorkflowStatus>> {
    let agents = registry::list_agents(state.db.pool(), Some(&workflow), Some(&tag)).await?;
    let agent_count = agents.len();

    let all_idle = match state.scheduler() {
        Some(scheduler) => scheduler.all_idle(&workflow, &tag),
        None => true,
    };

    let mut pending_inbox = false;
    for agent in &agents {
        let inbox = context::inbox_query(state.db.pool(), &agent.name, &workflow, &tag).await?;
        if !inbox.is_empty() {
            pending_inbox = true;
            break;
        }
    }

    Ok(Json(WorkflowStatus {
        workflow,
        tag,
        agent_count,
        all_idle,
        pending_inbox,
        complete: all_idle && !pending_inbox && agent_count > 0,
    }))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Path((workflow, tag)): Path<(String, String)>,
) -> HttpResult<Json<serde_json::Value>> {
    if let Some(scheduler) = state.scheduler() {
        let agents = registry::list_agents(state.db.pool(), Some(&workflow), Some(&tag)).await?;
        for agent in agents {
            scheduler.stop(&agent.name, &workflow, &tag).await;
        }
    }
    registry::remove_workflow(state.db.pool(), &workflow, &tag).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
