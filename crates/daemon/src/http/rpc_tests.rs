// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http::router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use conclave_core::FakeClock;
use conclave_storage::Db;
use http_body_util::BodyExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Notify;
use tower::ServiceExt;

async fn test_state() -> AppState {
    let db = Db::open_in_memory().await.unwrap();
    registry::ensure_global_workflow(db.pool(), 0).await.unwrap();
    registry::create_agent(
        db.pool(),
        registry::CreateAgentInput {
            name: "alice".into(),
            model: "gpt-5".into(),
            ..Default::default()
        },
        0,
    )
    .await
    .unwrap();
    AppState {
        db,
        clock: Arc::new(FakeClock::new(1_000)),
        started_at: std::time::Instant::now(),
        shutdown: Arc::new(Notify::new()),
        scheduler: Arc::new(RwLock::new(None)),
        documents: None,
        resource_threshold: conclave_core::RESOURCE_THRESHOLD,
    }
}

async fn call(
    app: axum::Router,
    agent: &str,
    tool: &str,
    arguments: Value,
) -> Value {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
    });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/mcp?agent={agent}"))
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_agent_query_param_is_a_transport_error() {
    let app = router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/mcp")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], PARSE_ERROR);
}

#[tokio::test]
async fn unknown_tool_is_reported_inside_the_content_envelope_not_as_a_transport_error() {
    let app = router(test_state().await);
    let body = call(app, "alice", "not_a_real_tool", json!({})).await;
    assert_eq!(body["result"]["isError"], true);
    assert!(body["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("unknown tool"));
}

#[tokio::test]
async fn team_members_lists_registered_agents() {
    let app = router(test_state().await);
    let body = call(app, "alice", "team_members", json!({})).await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let names: Vec<String> = serde_json::from_str(text).unwrap();
    assert_eq!(names, vec!["alice".to_string()]);
}

#[tokio::test]
async fn channel_send_then_my_inbox_round_trips_for_a_second_agent() {
    let state = test_state().await;
    registry::create_agent(
        state.db.pool(),
        registry::CreateAgentInput {
            name: "bob".into(),
            model: "gpt-5".into(),
            ..Default::default()
        },
        0,
    )
    .await
    .unwrap();
    let app = router(state);

    call(app.clone(), "alice", "channel_send", json!({ "content": "hi @bob" })).await;
    let body = call(app, "bob", "my_inbox", json!({})).await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let inbox: Value = serde_json::from_str(text).unwrap();
    assert_eq!(inbox.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn team_doc_read_without_a_configured_provider_is_a_tool_error() {
    let app = router(test_state().await);
    let body = call(app, "alice", "team_doc_read", json!({ "path": "notes.md" })).await;
    assert_eq!(body["result"]["isError"], true);
}

#[tokio::test]
async fn team_vote_on_an_invalid_choice_is_a_tool_error_not_a_transport_error() {
    let app = router(test_state().await);
    let proposal = call(
        app.clone(),
        "alice",
        "team_proposal_create",
        json!({ "proposal_type": "decision", "title": "pick one", "options": ["a", "b"] }),
    )
    .await;
    let text = proposal["result"]["content"][0]["text"].as_str().unwrap();
    let proposal: Value = serde_json::from_str(text).unwrap();
    let proposal_id = proposal["id"].as_str().unwrap();

    let body = call(
        app,
        "alice",
        "team_vote",
        json!({ "proposal_id": proposal_id, "choice": "not-an-option" }),
    )
    .await;
    assert_eq!(body["result"]["isError"], true);
}

