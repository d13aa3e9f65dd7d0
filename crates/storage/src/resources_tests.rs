// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Db;
use conclave_core::UuidIdGen;

#[tokio::test]
async fn create_then_read_round_trips_content_verbatim() {
    let db = Db::open_in_memory().await.unwrap();
    let content = "x".repeat(1500);
    let resource = create_resource(
        db.pool(),
        content.clone(),
        ContentType::Text,
        "alice".into(),
        "global",
        "main",
        &UuidIdGen,
        1,
    )
    .await
    .unwrap();
    assert!(resource.id.as_str().starts_with("res_"));

    let fetched = read_resource(db.pool(), resource.id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.content, content);
}

#[tokio::test]
async fn read_of_missing_id_is_none() {
    let db = Db::open_in_memory().await.unwrap();
    assert!(read_resource(db.pool(), "res_doesnotexist")
        .await
        .unwrap()
        .is_none());
}
