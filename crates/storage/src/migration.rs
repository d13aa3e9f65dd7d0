// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotent schema migrations, applied in one transaction at open.

use crate::error::Result;
use sqlx::SqlitePool;

/// Ordered list of idempotent DDL statements. Each entry is safe to run
/// against an already-migrated database.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS workflows (
        name TEXT NOT NULL,
        tag TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        config TEXT,
        PRIMARY KEY (name, tag)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS agents (
        name TEXT NOT NULL,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        model TEXT NOT NULL,
        backend TEXT NOT NULL,
        system_prompt TEXT,
        provider TEXT,
        schedule TEXT,
        config TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        PRIMARY KEY (name, workflow, tag)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_agents_scope ON agents (workflow, tag)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workers (
        agent TEXT NOT NULL,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        pid INTEGER,
        state TEXT NOT NULL,
        started_at_ms INTEGER NOT NULL,
        PRIMARY KEY (agent, workflow, tag)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        msg_id TEXT NOT NULL UNIQUE,
        sender TEXT NOT NULL,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        content TEXT NOT NULL,
        recipients TEXT NOT NULL,
        kind TEXT NOT NULL,
        to_agent TEXT,
        tool_call TEXT,
        metadata TEXT,
        created_at_ms INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_messages_scope ON messages (workflow, tag)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inbox_ack (
        agent TEXT NOT NULL,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        cursor INTEGER NOT NULL,
        PRIMARY KEY (agent, workflow, tag)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resources (
        res_id TEXT PRIMARY KEY,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL,
        creator TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proposals (
        prop_id TEXT PRIMARY KEY,
        workflow TEXT NOT NULL,
        tag TEXT NOT NULL,
        proposal_type TEXT NOT NULL,
        title TEXT NOT NULL,
        options TEXT NOT NULL,
        resolution TEXT NOT NULL,
        binding INTEGER NOT NULL,
        status TEXT NOT NULL,
        creator TEXT NOT NULL,
        result TEXT,
        created_at_ms INTEGER NOT NULL,
        resolved_at_ms INTEGER
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_proposals_scope ON proposals (workflow, tag)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        prop_id TEXT NOT NULL,
        agent TEXT NOT NULL,
        choice TEXT NOT NULL,
        reason TEXT,
        created_at_ms INTEGER NOT NULL,
        PRIMARY KEY (prop_id, agent)
    )
    "#,
];

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
