// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed resource storage: write-once, no mutation, no gc.

use crate::error::Result;
use conclave_core::id::short_suffix;
use conclave_core::{ContentType, IdGen, Resource, ResourceId, Scope};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

/// Create a resource inside an already-open transaction, so a message that
/// references it can be inserted atomically in the same commit (spec.md
/// §9, "content-addressed auto-resourcing inside send()").
pub async fn create_resource_tx(
    tx: &mut Transaction<'_, Sqlite>,
    content: String,
    content_type: ContentType,
    creator: String,
    workflow: &str,
    tag: &str,
    gen_id: &impl Fn() -> String,
    now_ms: i64,
) -> Result<Resource> {
    let id = ResourceId::new(format!("res_{}", gen_id().chars().take(12).collect::<String>()));
    sqlx::query(
        "INSERT INTO resources (res_id, workflow, tag, content, content_type, creator, created_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(workflow)
    .bind(tag)
    .bind(&content)
    .bind(content_type.as_str())
    .bind(&creator)
    .bind(now_ms)
    .execute(&mut **tx)
    .await?;
    Ok(Resource {
        id,
        scope: Scope::new(workflow, tag),
        content,
        content_type,
        creator,
        created_at_ms: now_ms,
    })
}

/// Allocate and store a resource outside of any caller-managed transaction
/// (the `resource_create` tool path).
pub async fn create_resource(
    pool: &SqlitePool,
    content: String,
    content_type: ContentType,
    creator: String,
    workflow: &str,
    tag: &str,
    gen: &impl IdGen,
    now_ms: i64,
) -> Result<Resource> {
    let id = ResourceId::new(format!("res_{}", short_suffix(gen)));
    sqlx::query(
        "INSERT INTO resources (res_id, workflow, tag, content, content_type, creator, created_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(workflow)
    .bind(tag)
    .bind(&content)
    .bind(content_type.as_str())
    .bind(&creator)
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(Resource {
        id,
        scope: Scope::new(workflow, tag),
        content,
        content_type,
        creator,
        created_at_ms: now_ms,
    })
}

pub async fn read_resource(pool: &SqlitePool, id: &str) -> Result<Option<Resource>> {
    let row = sqlx::query(
        "SELECT res_id, workflow, tag, content, content_type, creator, created_at_ms \
         FROM resources WHERE res_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(|row| {
        let content_type: String = row.try_get("content_type")?;
        Ok(Resource {
            id: ResourceId::new(row.try_get::<String, _>("res_id")?),
            scope: Scope::new(
                row.try_get::<String, _>("workflow")?,
                row.try_get::<String, _>("tag")?,
            ),
            content: row.try_get("content")?,
            content_type: ContentType::parse(&content_type).unwrap_or_default(),
            creator: row.try_get("creator")?,
            created_at_ms: row.try_get("created_at_ms")?,
        })
    })
    .transpose()
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
