// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context store: the channel (append-only message log) and each agent's
//! inbox view over it.
//!
//! This is the hardest piece of the kernel (spec.md §4.3). `channel_send`
//! parses `@mentions` against the live workflow membership, auto-resources
//! oversized payloads, and returns the resolved recipient set so the HTTP
//! layer — not this module — can perform the scheduler wake fan-out
//! (spec.md §9, "implicit fan-out coupling").

use crate::error::{Result, StorageError};
use crate::registry;
use crate::resources;
use conclave_core::scope::ALL_RECIPIENTS;
use conclave_core::{
    is_urgent, parse_mentions, ContentType, Message, MessageId, MessageKind, Priority,
    SendOptions, RESOURCE_PREVIEW_CHARS, RESOURCE_THRESHOLD,
};
use sqlx::{Row, SqlitePool};

/// Result of a successful `channel.send`, used by the HTTP layer to wake
/// every recipient's scheduler.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub id: MessageId,
    pub recipients: Vec<String>,
}

pub async fn channel_send(
    pool: &SqlitePool,
    sender: &str,
    content: &str,
    workflow: &str,
    tag: &str,
    options: SendOptions,
    gen_id: impl Fn() -> String,
    now_ms: i64,
) -> Result<SendResult> {
    let members = registry::list_agent_names(pool, workflow, tag).await?;

    let mut recipients = if let Some(to) = options.to.clone() {
        vec![to]
    } else {
        let mentioned = parse_mentions(content, &members);
        if mentioned.iter().any(|m| m == ALL_RECIPIENTS) {
            members.iter().filter(|m| *m != sender).cloned().collect()
        } else {
            mentioned
        }
    };
    recipients.retain(|r| r != sender);

    let mut tx = pool.begin().await?;

    let threshold = options.resource_threshold.unwrap_or(RESOURCE_THRESHOLD);
    let mut stored_content = content.to_string();
    if content.chars().count() > threshold && !options.skip_auto_resource {
        let resource = resources::create_resource_tx(
            &mut tx,
            content.to_string(),
            ContentType::Text,
            sender.to_string(),
            workflow,
            tag,
            &gen_id,
            now_ms,
        )
        .await?;
        let preview: String = content.chars().take(RESOURCE_PREVIEW_CHARS).collect();
        stored_content = format!("[Resource {}]: {}…", resource.id, preview);
    }

    let recipients_json = serde_json::to_string(&recipients)?;
    let kind = options.kind.unwrap_or_default();
    let tool_call_json = options
        .tool_call
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let metadata_json = options
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let msg_id = gen_id();

    sqlx::query(
        "INSERT INTO messages (msg_id, sender, workflow, tag, content, recipients, kind, to_agent, tool_call, metadata, created_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&msg_id)
    .bind(sender)
    .bind(workflow)
    .bind(tag)
    .bind(&stored_content)
    .bind(&recipients_json)
    .bind(kind.as_str())
    .bind(&options.to)
    .bind(&tool_call_json)
    .bind(&metadata_json)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(SendResult {
        id: MessageId::new(msg_id),
        recipients,
    })
}

/// Resolve a message id to its sequence (SQLite rowid).
async fn sequence_of(pool: &SqlitePool, msg_id: &str) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT rowid FROM messages WHERE msg_id = ?")
        .bind(msg_id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| r.try_get::<i64, _>("rowid").map_err(Into::into))
        .transpose()
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub since: Option<MessageId>,
    pub limit: Option<usize>,
    pub agent: Option<String>,
}

/// Read channel messages in chronological order. `since` is a message id,
/// not a timestamp — resolved to its sequence number so only strictly
/// later messages are returned. When `agent` is given, direct messages
/// whose sender and `to` both differ from `agent` are excluded.
pub async fn channel_read(
    pool: &SqlitePool,
    workflow: &str,
    tag: &str,
    options: ReadOptions,
) -> Result<Vec<Message>> {
    let since_seq = match &options.since {
        Some(id) => sequence_of(pool, id.as_str()).await?.unwrap_or(i64::MAX),
        None => 0,
    };

    let rows = sqlx::query(
        "SELECT rowid, msg_id, sender, workflow, tag, content, recipients, kind, to_agent, tool_call, metadata, created_at_ms \
         FROM messages WHERE workflow = ? AND tag = ? AND rowid > ? ORDER BY rowid ASC",
    )
    .bind(workflow)
    .bind(tag)
    .bind(since_seq)
    .fetch_all(pool)
    .await?;

    let mut messages: Vec<Message> = rows
        .into_iter()
        .map(row_to_message)
        .collect::<Result<Vec<_>>>()?;

    if let Some(agent) = &options.agent {
        messages.retain(|m| match &m.to {
            Some(to) => &m.sender == agent || to == agent,
            None => true,
        });
    }

    if let Some(limit) = options.limit {
        if messages.len() > limit {
            let drop = messages.len() - limit;
            messages.drain(0..drop);
        }
    }

    Ok(messages)
}

/// One unread inbox entry with its computed delivery priority.
#[derive(Debug, Clone)]
pub struct InboxEntry {
    pub message: Message,
    pub priority: Priority,
}

/// Unread, prioritised messages addressed to `agent` (spec.md §4.3).
pub async fn inbox_query(
    pool: &SqlitePool,
    agent: &str,
    workflow: &str,
    tag: &str,
) -> Result<Vec<InboxEntry>> {
    let cursor = cursor_of(pool, agent, workflow, tag).await?.unwrap_or(0);

    let rows = sqlx::query(
        "SELECT rowid, msg_id, sender, workflow, tag, content, recipients, kind, to_agent, tool_call, metadata, created_at_ms \
         FROM messages WHERE workflow = ? AND tag = ? AND sender != ? AND rowid > ? ORDER BY rowid ASC",
    )
    .bind(workflow)
    .bind(tag)
    .bind(agent)
    .bind(cursor)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        let message = row_to_message(row)?;
        if !message.recipients.iter().any(|r| r == agent || r == ALL_RECIPIENTS) {
            continue;
        }
        let priority = if message.recipients.len() > 1 || is_urgent(&message.content) {
            Priority::High
        } else {
            Priority::Normal
        };
        entries.push(InboxEntry { message, priority });
    }
    Ok(entries)
}

async fn cursor_of(pool: &SqlitePool, agent: &str, workflow: &str, tag: &str) -> Result<Option<i64>> {
    let row = sqlx::query("SELECT cursor FROM inbox_ack WHERE agent = ? AND workflow = ? AND tag = ?")
        .bind(agent)
        .bind(workflow)
        .bind(tag)
        .fetch_optional(pool)
        .await?;
    row.map(|r| r.try_get::<i64, _>("cursor").map_err(Into::into))
        .transpose()
}

async fn set_cursor(pool: &SqlitePool, agent: &str, workflow: &str, tag: &str, cursor: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO inbox_ack (agent, workflow, tag, cursor) VALUES (?, ?, ?, ?) \
         ON CONFLICT(agent, workflow, tag) DO UPDATE SET cursor = excluded.cursor",
    )
    .bind(agent)
    .bind(workflow)
    .bind(tag)
    .bind(cursor)
    .execute(pool)
    .await?;
    Ok(())
}

/// Advance `agent`'s cursor to (at least) `message_id`. No-op if the
/// message does not exist.
pub async fn inbox_ack(
    pool: &SqlitePool,
    agent: &str,
    workflow: &str,
    tag: &str,
    message_id: &MessageId,
) -> Result<()> {
    if let Some(seq) = sequence_of(pool, message_id.as_str()).await? {
        set_cursor(pool, agent, workflow, tag, seq).await?;
    }
    Ok(())
}

/// Advance `agent`'s cursor to the last message currently qualifying for
/// its inbox. No-op when the inbox is already empty.
pub async fn inbox_ack_all(pool: &SqlitePool, agent: &str, workflow: &str, tag: &str) -> Result<()> {
    let entries = inbox_query(pool, agent, workflow, tag).await?;
    if let Some(last) = entries.last() {
        set_cursor(pool, agent, workflow, tag, last.message.sequence).await?;
    }
    Ok(())
}

fn row_to_message(row: sqlx::sqlite::SqliteRow) -> Result<Message> {
    let kind: String = row.try_get("kind")?;
    let recipients_json: String = row.try_get("recipients")?;
    let tool_call_json: Option<String> = row.try_get("tool_call")?;
    let metadata_json: Option<String> = row.try_get("metadata")?;
    Ok(Message {
        id: MessageId::new(row.try_get::<String, _>("msg_id")?),
        sequence: row.try_get("rowid")?,
        sender: row.try_get("sender")?,
        scope: conclave_core::Scope::new(
            row.try_get::<String, _>("workflow")?,
            row.try_get::<String, _>("tag")?,
        ),
        content: row.try_get("content")?,
        recipients: serde_json::from_str(&recipients_json)?,
        kind: MessageKind::parse(&kind)
            .ok_or_else(|| StorageError::Validation(format!("bad message kind {kind}")))?,
        to: row.try_get("to_agent")?,
        tool_call: tool_call_json.map(|s| serde_json::from_str(&s)).transpose()?,
        metadata: metadata_json.map(|s| serde_json::from_str(&s)).transpose()?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
