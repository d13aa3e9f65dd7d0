// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC tool dispatcher workers call over `/mcp?agent=<name>` (spec.md
//! §4.9). Agent identity always comes from the query parameter; request
//! bodies are untrusted. Tool-level validation failures are reported
//! inside the MCP content envelope (`isError: true`), never as JSON-RPC
//! transport errors (SPEC_FULL.md §4.9a) — those are reserved for
//! malformed envelopes, unknown methods, and a missing `?agent=`.

use super::AppState;
use conclave_core::{scope::GLOBAL_WORKFLOW, scope::MAIN_TAG, ContentType, SendOptions, UuidIdGen};
use conclave_storage::{context, documents, proposals, registry};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub fn routes() -> axum::Router<AppState> {
    axum::Router::new().route("/mcp", axum::routing::post(dispatch))
}

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

const PARSE_ERROR: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const SERVER_ERROR: i64 = -32000;

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> axum::Json<Value> {
    axum::Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    }))
}

fn ok_content(id: Value, text: String) -> axum::Json<Value> {
    axum::Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "content": [{ "type": "text", "text": text }] },
    }))
}

fn error_content(id: Value, text: String) -> axum::Json<Value> {
    axum::Json(json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "content": [{ "type": "text", "text": text }], "isError": true },
    }))
}

async fn dispatch(
    axum::extract::State(state): axum::extract::State<AppState>,
    axum::extract::Query(q): axum::extract::Query<std::collections::HashMap<String, String>>,
    body: axum::body::Bytes,
) -> axum::Json<Value> {
    let Some(agent) = q.get("agent").cloned() else {
        return rpc_error(Value::Null, PARSE_ERROR, "missing ?agent= identity");
    };

    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => return rpc_error(Value::Null, PARSE_ERROR, format!("malformed envelope: {e}")),
    };
    let id = request.id.clone();

    if request.jsonrpc != "2.0" && !request.jsonrpc.is_empty() {
        return rpc_error(id, PARSE_ERROR, "unsupported jsonrpc version");
    }
    if request.method != "tools/call" {
        return rpc_error(id, METHOD_NOT_FOUND, format!("unknown method: {}", request.method));
    }

    let call: CallParams = match serde_json::from_value(request.params) {
        Ok(call) => call,
        Err(e) => return rpc_error(id, INVALID_PARAMS, format!("bad params: {e}")),
    };

    let (workflow, tag) = match registry::find_agent_any(state.db.pool(), &agent).await {
        Ok(Some(spec)) => (spec.scope.workflow, spec.scope.tag),
        Ok(None) => (GLOBAL_WORKFLOW.to_string(), MAIN_TAG.to_string()),
        Err(e) => return rpc_error(id, SERVER_ERROR, e.to_string()),
    };

    match call_tool(&state, &agent, &workflow, &tag, &call.name, call.arguments).await {
        Ok(text) => ok_content(id, text),
        Err(ToolOutcome::Invalid(text)) => error_content(id, text),
        Err(ToolOutcome::Transport(msg)) => rpc_error(id, SERVER_ERROR, msg),
    }
}

enum ToolOutcome {
    /// A tool-level validation failure — reported inside the content
    /// envelope with `isError: true`, never as a JSON-RPC error.
    Invalid(String),
    /// An unexpected storage failure, reported as a transport error.
    Transport(String),
}

impl From<conclave_storage::StorageError> for ToolOutcome {
    fn from(err: conclave_storage::StorageError) -> Self {
        match err {
            conclave_storage::StorageError::NotFound(m)
            | conclave_storage::StorageError::Duplicate(m)
            | conclave_storage::StorageError::Validation(m) => ToolOutcome::Invalid(m),
            other => ToolOutcome::Transport(other.to_string()),
        }
    }
}

async fn call_tool(
    state: &AppState,
    agent: &str,
    workflow: &str,
    tag: &str,
    tool: &str,
    arguments: Value,
) -> Result<String, ToolOutcome> {
    let pool = state.db.pool();
    let now_ms = state.clock.epoch_ms();

    match tool {
        "channel_send" => {
            #[derive(Deserialize)]
            struct Args {
                content: String,
                #[serde(default)]
                to: Option<String>,
            }
            let args: Args = parse_args(arguments)?;
            let options = SendOptions {
                to: args.to,
                resource_threshold: Some(state.resource_threshold),
                ..Default::default()
            };
            let result = context::channel_send(
                pool,
                agent,
                &args.content,
                workflow,
                tag,
                options,
                || UuidIdGen.next(),
                now_ms,
            )
            .await?;
            state.wake_all(workflow, tag, &result.recipients).await;
            Ok(json_text(json!({ "id": result.id.to_string(), "recipients": result.recipients })))
        }
        "channel_read" => {
            #[derive(Deserialize, Default)]
            struct Args {
                #[serde(default)]
                since: Option<String>,
                #[serde(default)]
                limit: Option<usize>,
            }
            let args: Args = parse_args(arguments)?;
            let options = context::ReadOptions {
                since: args.since.map(conclave_core::MessageId::new),
                limit: args.limit,
                agent: None,
            };
            let messages = context::channel_read(pool, workflow, tag, options).await?;
            Ok(json_text(json!(messages)))
        }
        "my_inbox" => {
            let inbox = context::inbox_query(pool, agent, workflow, tag).await?;
            let view: Vec<_> = inbox
                .into_iter()
                .map(|entry| json!({ "message": entry.message, "priority": entry.priority }))
                .collect();
            Ok(json_text(json!(view)))
        }
        "my_inbox_ack" => {
            #[derive(Deserialize)]
            struct Args {
                #[serde(default)]
                message_id: Option<String>,
            }
            let args: Args = parse_args(arguments)?;
            match args.message_id {
                Some(id) => context::inbox_ack(pool, agent, workflow, tag, &conclave_core::MessageId::new(id)).await?,
                None => context::inbox_ack_all(pool, agent, workflow, tag).await?,
            }
            Ok(json_text(json!({ "ok": true })))
        }
        "team_members" => {
            let names = registry::list_agent_names(pool, workflow, tag).await?;
            Ok(json_text(json!(names)))
        }
        "my_status_set" => {
            #[derive(Deserialize)]
            struct Args {
                state: conclave_core::AgentState,
            }
            let args: Args = parse_args(arguments)?;
            registry::update_agent_state(pool, agent, workflow, tag, args.state).await?;
            Ok(json_text(json!({ "ok": true })))
        }
        "resource_create" => {
            #[derive(Deserialize)]
            struct Args {
                content: String,
                #[serde(default)]
                content_type: ContentType,
            }
            let args: Args = parse_args(arguments)?;
            let resource = conclave_storage::resources::create_resource(
                pool,
                args.content,
                args.content_type,
                agent.to_string(),
                workflow,
                tag,
                &UuidIdGen,
                now_ms,
            )
            .await?;
            Ok(json_text(json!(resource)))
        }
        "resource_read" => {
            #[derive(Deserialize)]
            struct Args {
                id: String,
            }
            let args: Args = parse_args(arguments)?;
            match conclave_storage::resources::read_resource(pool, &args.id).await? {
                Some(resource) => Ok(json_text(json!(resource))),
                None => Err(ToolOutcome::Invalid(format!("resource {} not found", args.id))),
            }
        }
        "team_doc_read" => with_documents(state, |docs| {
            #[derive(Deserialize)]
            struct Args {
                path: String,
            }
            let workflow = workflow.to_string();
            let tag = tag.to_string();
            async move {
                let args: Args = parse_args(arguments)?;
                match docs.read(&workflow, &tag, &args.path).await? {
                    Some(content) => Ok(content),
                    None => Err(ToolOutcome::Invalid(format!("document {} not found", args.path))),
                }
            }
        })
        .await,
        "team_doc_write" => with_documents(state, |docs| {
            #[derive(Deserialize)]
            struct Args {
                path: String,
                content: String,
            }
            let workflow = workflow.to_string();
            let tag = tag.to_string();
            async move {
                let args: Args = parse_args(arguments)?;
                docs.write(&workflow, &tag, &args.path, &args.content).await?;
                Ok(json_text(json!({ "ok": true })))
            }
        })
        .await,
        "team_doc_append" => with_documents(state, |docs| {
            #[derive(Deserialize)]
            struct Args {
                path: String,
                content: String,
            }
            let workflow = workflow.to_string();
            let tag = tag.to_string();
            async move {
                let args: Args = parse_args(arguments)?;
                docs.append(&workflow, &tag, &args.path, &args.content).await?;
                Ok(json_text(json!({ "ok": true })))
            }
        })
        .await,
        "team_doc_create" => with_documents(state, |docs| {
            #[derive(Deserialize)]
            struct Args {
                path: String,
                #[serde(default)]
                content: String,
            }
            let workflow = workflow.to_string();
            let tag = tag.to_string();
            async move {
                let args: Args = parse_args(arguments)?;
                docs.create(&workflow, &tag, &args.path, &args.content).await?;
                Ok(json_text(json!({ "ok": true })))
            }
        })
        .await,
        "team_doc_list" => with_documents(state, |docs| {
            #[derive(Deserialize, Default)]
            struct Args {
                #[serde(default)]
                dir: String,
            }
            let workflow = workflow.to_string();
            let tag = tag.to_string();
            async move {
                let args: Args = parse_args(arguments)?;
                let entries = docs.list(&workflow, &tag, &args.dir).await?;
                Ok(json_text(json!(entries)))
            }
        })
        .await,
        "team_proposal_create" => {
            #[derive(Deserialize)]
            struct Args {
                proposal_type: conclave_core::ProposalType,
                title: String,
                options: Vec<String>,
                #[serde(default)]
                resolution: conclave_core::ResolutionRule,
                #[serde(default)]
                binding: bool,
            }
            let args: Args = parse_args(arguments)?;
            let input = proposals::CreateProposalInput {
                proposal_type: args.proposal_type,
                title: args.title,
                options: args.options,
                resolution: args.resolution,
                binding: args.binding,
                creator: agent.to_string(),
            };
            let proposal = proposals::create(pool, workflow, tag, input, &UuidIdGen, now_ms).await?;
            Ok(json_text(json!(proposal)))
        }
        "team_vote" => {
            #[derive(Deserialize)]
            struct Args {
                proposal_id: String,
                choice: String,
                #[serde(default)]
                reason: Option<String>,
            }
            let args: Args = parse_args(arguments)?;
            let eligible = registry::list_agent_names(pool, workflow, tag).await?.len();
            let proposal = proposals::vote(pool, &args.proposal_id, agent, &args.choice, args.reason, eligible, now_ms).await?;
            Ok(json_text(json!(proposal)))
        }
        "team_proposal_status" => {
            #[derive(Deserialize)]
            struct Args {
                #[serde(default)]
                proposal_id: Option<String>,
            }
            let args: Args = parse_args(arguments)?;
            match args.proposal_id {
                Some(id) => match proposals::get(pool, &id).await? {
                    Some(proposal) => Ok(json_text(json!(proposal))),
                    None => Err(ToolOutcome::Invalid(format!("proposal {id} not found"))),
                },
                None => Ok(json_text(json!(proposals::list(pool, workflow, tag).await?))),
            }
        }
        "team_proposal_cancel" => {
            #[derive(Deserialize)]
            struct Args {
                proposal_id: String,
            }
            let args: Args = parse_args(arguments)?;
            proposals::cancel(pool, &args.proposal_id, agent).await?;
            Ok(json_text(json!({ "ok": true })))
        }
        other => Err(ToolOutcome::Invalid(format!("unknown tool: {other}"))),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolOutcome> {
    serde_json::from_value(arguments).map_err(|e| ToolOutcome::Invalid(format!("bad arguments: {e}")))
}

fn json_text(value: Value) -> String {
    serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
}

/// The document provider is optional at kernel level (spec.md §4.10); when
/// absent every `team_doc_*` tool replies with a diagnostic tool error
/// rather than a transport failure.
async fn with_documents<F, Fut>(state: &AppState, make: F) -> Result<String, ToolOutcome>
where
    F: FnOnce(std::sync::Arc<documents::DocumentProvider>) -> Fut,
    Fut: std::future::Future<Output = Result<String, ToolOutcome>>,
{
    match &state.documents {
        Some(docs) => make(docs.clone()).await,
        None => Err(ToolOutcome::Invalid(
            "no document provider configured for this daemon".to_string(),
        )),
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
