// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry: workflows, agents and workers — CRUD and scoped lookup.

use crate::error::{Result, StorageError};
use conclave_core::{
    scope::GLOBAL_WORKFLOW, scope::MAIN_TAG, AgentBackend, AgentSchedule, AgentSpec, AgentState,
    ProviderConfig, Scope, Worker, WorkerState, Workflow, WorkflowState,
};
use sqlx::{Row, SqlitePool};

/// Create `(global, main)` if it does not already exist. Idempotent.
pub async fn ensure_global_workflow(pool: &SqlitePool, now_ms: i64) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO workflows (name, tag, state, created_at_ms, config) \
         VALUES (?, ?, ?, ?, NULL)",
    )
    .bind(GLOBAL_WORKFLOW)
    .bind(MAIN_TAG)
    .bind(WorkflowState::Running.as_str())
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_workflow(
    pool: &SqlitePool,
    name: &str,
    tag: &str,
    config: Option<serde_json::Value>,
    now_ms: i64,
) -> Result<Workflow> {
    let config_json = config.as_ref().map(serde_json::to_string).transpose()?;
    let result = sqlx::query(
        "INSERT OR IGNORE INTO workflows (name, tag, state, created_at_ms, config) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(tag)
    .bind(WorkflowState::Running.as_str())
    .bind(now_ms)
    .bind(&config_json)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::Duplicate(format!("workflow {name}:{tag}")));
    }
    Ok(Workflow {
        name: name.to_string(),
        tag: tag.to_string(),
        state: WorkflowState::Running,
        created_at_ms: now_ms,
        config,
    })
}

pub async fn get_workflow(pool: &SqlitePool, name: &str, tag: &str) -> Result<Option<Workflow>> {
    let row = sqlx::query(
        "SELECT name, tag, state, created_at_ms, config FROM workflows WHERE name = ? AND tag = ?",
    )
    .bind(name)
    .bind(tag)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_workflow).transpose()
}

pub async fn list_workflows(pool: &SqlitePool) -> Result<Vec<Workflow>> {
    let rows = sqlx::query("SELECT name, tag, state, created_at_ms, config FROM workflows")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_workflow).collect()
}

pub async fn remove_workflow(pool: &SqlitePool, name: &str, tag: &str) -> Result<()> {
    sqlx::query("DELETE FROM agents WHERE workflow = ? AND tag = ?")
        .bind(name)
        .bind(tag)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM workers WHERE workflow = ? AND tag = ?")
        .bind(name)
        .bind(tag)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM workflows WHERE name = ? AND tag = ?")
        .bind(name)
        .bind(tag)
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_workflow(row: sqlx::sqlite::SqliteRow) -> Result<Workflow> {
    let config_json: Option<String> = row.try_get("config")?;
    let config = config_json.map(|s| serde_json::from_str(&s)).transpose()?;
    let state: String = row.try_get("state")?;
    Ok(Workflow {
        name: row.try_get("name")?,
        tag: row.try_get("tag")?,
        state: WorkflowState::parse(&state)
            .ok_or_else(|| StorageError::Validation(format!("bad workflow state {state}")))?,
        created_at_ms: row.try_get("created_at_ms")?,
        config,
    })
}

/// Input accepted by [`create_agent`]. `workflow`/`tag` default to
/// `(global, main)` and `backend` defaults to [`AgentBackend::default`],
/// per spec.md §4.2.
#[derive(Debug, Clone, Default)]
pub struct CreateAgentInput {
    pub name: String,
    pub workflow: Option<String>,
    pub tag: Option<String>,
    pub model: String,
    pub backend: Option<AgentBackend>,
    pub system_prompt: Option<String>,
    pub provider: Option<ProviderConfig>,
    pub schedule: Option<AgentSchedule>,
    pub config: Option<serde_json::Value>,
}

/// Create an agent, implicitly creating its workflow if absent. Fails with
/// [`StorageError::Duplicate`] when `(name, workflow, tag)` already exists.
pub async fn create_agent(
    pool: &SqlitePool,
    input: CreateAgentInput,
    now_ms: i64,
) -> Result<AgentSpec> {
    let workflow = input.workflow.unwrap_or_else(|| GLOBAL_WORKFLOW.to_string());
    let tag = input.tag.unwrap_or_else(|| MAIN_TAG.to_string());
    let backend = input.backend.unwrap_or_default();

    if get_workflow(pool, &workflow, &tag).await?.is_none() {
        create_workflow(pool, &workflow, &tag, None, now_ms).await?;
    }

    let provider_json = input.provider.as_ref().map(serde_json::to_string).transpose()?;
    let schedule_json = input.schedule.as_ref().map(serde_json::to_string).transpose()?;
    let config = input.config.unwrap_or_else(|| serde_json::json!({}));
    let config_json = serde_json::to_string(&config)?;

    let result = sqlx::query(
        "INSERT OR IGNORE INTO agents \
         (name, workflow, tag, model, backend, system_prompt, provider, schedule, config, state, created_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&workflow)
    .bind(&tag)
    .bind(&input.model)
    .bind(backend.to_string())
    .bind(&input.system_prompt)
    .bind(&provider_json)
    .bind(&schedule_json)
    .bind(&config_json)
    .bind(AgentState::Idle.as_str())
    .bind(now_ms)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::Duplicate(format!(
            "agent {}:{workflow}:{tag}",
            input.name
        )));
    }

    Ok(AgentSpec {
        name: input.name,
        scope: Scope::new(workflow, tag),
        model: input.model,
        backend,
        system_prompt: input.system_prompt,
        provider: input.provider,
        schedule: input.schedule,
        config,
        state: AgentState::Idle,
        created_at_ms: now_ms,
    })
}

pub async fn get_agent(
    pool: &SqlitePool,
    name: &str,
    workflow: &str,
    tag: &str,
) -> Result<Option<AgentSpec>> {
    let row = sqlx::query(
        "SELECT name, workflow, tag, model, backend, system_prompt, provider, schedule, config, state, created_at_ms \
         FROM agents WHERE name = ? AND workflow = ? AND tag = ?",
    )
    .bind(name)
    .bind(workflow)
    .bind(tag)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_agent).transpose()
}

/// Find any agent registered under `name`, regardless of workflow instance,
/// for callers (the tool dispatcher) that only have a bare agent name to
/// resolve a scope from (spec.md §4.9). Falls back to `(global, main)` when
/// no row matches by leaving the lookup to the caller.
pub async fn find_agent_any(pool: &SqlitePool, name: &str) -> Result<Option<AgentSpec>> {
    let row = sqlx::query(
        "SELECT name, workflow, tag, model, backend, system_prompt, provider, schedule, config, state, created_at_ms \
         FROM agents WHERE name = ? LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_agent).transpose()
}

/// List agents. When both `workflow` and `tag` are given, scopes to that
/// workflow instance; when both are omitted, returns every agent.
pub async fn list_agents(
    pool: &SqlitePool,
    workflow: Option<&str>,
    tag: Option<&str>,
) -> Result<Vec<AgentSpec>> {
    let rows = match (workflow, tag) {
        (Some(w), Some(t)) => {
            sqlx::query(
                "SELECT name, workflow, tag, model, backend, system_prompt, provider, schedule, config, state, created_at_ms \
                 FROM agents WHERE workflow = ? AND tag = ? ORDER BY created_at_ms",
            )
            .bind(w)
            .bind(t)
            .fetch_all(pool)
            .await?
        }
        _ => {
            sqlx::query(
                "SELECT name, workflow, tag, model, backend, system_prompt, provider, schedule, config, state, created_at_ms \
                 FROM agents ORDER BY created_at_ms",
            )
            .fetch_all(pool)
            .await?
        }
    };
    rows.into_iter().map(row_to_agent).collect()
}

/// Names of every agent in a workflow instance, for mention resolution.
pub async fn list_agent_names(pool: &SqlitePool, workflow: &str, tag: &str) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM agents WHERE workflow = ? AND tag = ?")
        .bind(workflow)
        .bind(tag)
        .fetch_all(pool)
        .await?;
    rows.into_iter()
        .map(|r| r.try_get::<String, _>("name").map_err(Into::into))
        .collect()
}

/// Update an agent's runtime state. Called exclusively by the scheduler
/// (or the delete path); no effect if the agent is absent.
pub async fn update_agent_state(
    pool: &SqlitePool,
    name: &str,
    workflow: &str,
    tag: &str,
    state: AgentState,
) -> Result<()> {
    sqlx::query("UPDATE agents SET state = ? WHERE name = ? AND workflow = ? AND tag = ?")
        .bind(state.as_str())
        .bind(name)
        .bind(workflow)
        .bind(tag)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn remove_agent(pool: &SqlitePool, name: &str, workflow: &str, tag: &str) -> Result<()> {
    sqlx::query("DELETE FROM workers WHERE agent = ? AND workflow = ? AND tag = ?")
        .bind(name)
        .bind(workflow)
        .bind(tag)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM agents WHERE name = ? AND workflow = ? AND tag = ?")
        .bind(name)
        .bind(workflow)
        .bind(tag)
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_agent(row: sqlx::sqlite::SqliteRow) -> Result<AgentSpec> {
    let backend: String = row.try_get("backend")?;
    let state: String = row.try_get("state")?;
    let provider_json: Option<String> = row.try_get("provider")?;
    let schedule_json: Option<String> = row.try_get("schedule")?;
    let config_json: String = row.try_get("config")?;
    Ok(AgentSpec {
        name: row.try_get("name")?,
        scope: Scope::new(row.try_get::<String, _>("workflow")?, row.try_get::<String, _>("tag")?),
        model: row.try_get("model")?,
        backend: AgentBackend::parse(&backend)
            .ok_or_else(|| StorageError::Validation(format!("bad backend {backend}")))?,
        system_prompt: row.try_get("system_prompt")?,
        provider: provider_json.map(|s| serde_json::from_str(&s)).transpose()?,
        schedule: schedule_json.map(|s| serde_json::from_str(&s)).transpose()?,
        config: serde_json::from_str(&config_json)?,
        state: AgentState::parse(&state)
            .ok_or_else(|| StorageError::Validation(format!("bad agent state {state}")))?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

/// Upsert the worker row for `(agent, workflow, tag)` on spawn.
pub async fn upsert_worker(
    pool: &SqlitePool,
    agent: &str,
    workflow: &str,
    tag: &str,
    pid: u32,
    now_ms: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO workers (agent, workflow, tag, pid, state, started_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?) \
         ON CONFLICT(agent, workflow, tag) DO UPDATE SET pid = excluded.pid, state = excluded.state, started_at_ms = excluded.started_at_ms",
    )
    .bind(agent)
    .bind(workflow)
    .bind(tag)
    .bind(pid)
    .bind(WorkerState::Running.as_str())
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(())
}

/// Nullify the worker row for `(agent, workflow, tag)` on exit.
pub async fn clear_worker(pool: &SqlitePool, agent: &str, workflow: &str, tag: &str) -> Result<()> {
    sqlx::query(
        "UPDATE workers SET pid = NULL, state = ? WHERE agent = ? AND workflow = ? AND tag = ?",
    )
    .bind(WorkerState::Idle.as_str())
    .bind(agent)
    .bind(workflow)
    .bind(tag)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_worker(
    pool: &SqlitePool,
    agent: &str,
    workflow: &str,
    tag: &str,
) -> Result<Option<Worker>> {
    let row = sqlx::query(
        "SELECT agent, workflow, tag, pid, state, started_at_ms FROM workers \
         WHERE agent = ? AND workflow = ? AND tag = ?",
    )
    .bind(agent)
    .bind(workflow)
    .bind(tag)
    .fetch_optional(pool)
    .await?;
    row.map(|row| {
        let state: String = row.try_get("state")?;
        let pid: Option<i64> = row.try_get("pid")?;
        Ok(Worker {
            agent: row.try_get("agent")?,
            scope: Scope::new(row.try_get::<String, _>("workflow")?, row.try_get::<String, _>("tag")?),
            pid: pid.map(|p| p as u32),
            state: WorkerState::parse(&state)
                .ok_or_else(|| StorageError::Validation(format!("bad worker state {state}")))?,
            started_at_ms: row.try_get("started_at_ms")?,
        })
    })
    .transpose()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
