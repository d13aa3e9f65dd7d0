// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proposal engine: create, vote, cancel. Resolution itself is the pure
//! [`conclave_core::proposal::resolve`] function; this module's job is
//! persisting the tally and applying the verdict (spec.md §4.5).

use crate::error::{Result, StorageError};
use conclave_core::id::short_suffix;
use conclave_core::{
    proposal::resolve, IdGen, Proposal, ProposalId, ProposalStatus, ProposalType, ResolutionRule, Scope,
};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

/// Input accepted by [`create`].
#[derive(Debug, Clone)]
pub struct CreateProposalInput {
    pub proposal_type: ProposalType,
    pub title: String,
    pub options: Vec<String>,
    pub resolution: ResolutionRule,
    pub binding: bool,
    pub creator: String,
}

pub async fn create(
    pool: &SqlitePool,
    workflow: &str,
    tag: &str,
    input: CreateProposalInput,
    gen: &impl IdGen,
    now_ms: i64,
) -> Result<Proposal> {
    if input.options.is_empty() {
        return Err(StorageError::Validation(
            "a proposal needs at least one option".into(),
        ));
    }
    let id = ProposalId::new(format!("prop_{}", short_suffix(gen)));
    let options_json = serde_json::to_string(&input.options)?;
    sqlx::query(
        "INSERT INTO proposals \
         (prop_id, workflow, tag, proposal_type, title, options, resolution, binding, status, creator, result, created_at_ms, resolved_at_ms) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, NULL)",
    )
    .bind(id.as_str())
    .bind(workflow)
    .bind(tag)
    .bind(input.proposal_type.as_str())
    .bind(&input.title)
    .bind(&options_json)
    .bind(input.resolution.as_str())
    .bind(input.binding)
    .bind(ProposalStatus::Active.as_str())
    .bind(&input.creator)
    .bind(now_ms)
    .execute(pool)
    .await?;

    Ok(Proposal {
        id,
        scope: Scope::new(workflow, tag),
        proposal_type: input.proposal_type,
        title: input.title,
        options: input.options,
        resolution: input.resolution,
        binding: input.binding,
        status: ProposalStatus::Active,
        creator: input.creator,
        result: None,
        created_at_ms: now_ms,
        resolved_at_ms: None,
    })
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<Proposal>> {
    let row = sqlx::query(
        "SELECT prop_id, workflow, tag, proposal_type, title, options, resolution, binding, status, creator, result, created_at_ms, resolved_at_ms \
         FROM proposals WHERE prop_id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_proposal).transpose()
}

pub async fn list(pool: &SqlitePool, workflow: &str, tag: &str) -> Result<Vec<Proposal>> {
    let rows = sqlx::query(
        "SELECT prop_id, workflow, tag, proposal_type, title, options, resolution, binding, status, creator, result, created_at_ms, resolved_at_ms \
         FROM proposals WHERE workflow = ? AND tag = ? ORDER BY created_at_ms",
    )
    .bind(workflow)
    .bind(tag)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(row_to_proposal).collect()
}

/// Record `agent`'s vote (upserting any prior vote) and re-evaluate
/// resolution. Returns the proposal's state after the vote. A vote on a
/// non-active proposal is rejected.
pub async fn vote(
    pool: &SqlitePool,
    proposal_id: &str,
    agent: &str,
    choice: &str,
    reason: Option<String>,
    eligible_count: usize,
    now_ms: i64,
) -> Result<Proposal> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "SELECT prop_id, workflow, tag, proposal_type, title, options, resolution, binding, status, creator, result, created_at_ms, resolved_at_ms \
         FROM proposals WHERE prop_id = ?",
    )
    .bind(proposal_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StorageError::NotFound(format!("proposal {proposal_id}")))?;
    let mut proposal = row_to_proposal(row)?;

    if proposal.status != ProposalStatus::Active {
        return Err(StorageError::Validation(format!(
            "proposal {proposal_id} is not active"
        )));
    }
    if !proposal.options.iter().any(|o| o == choice) {
        return Err(StorageError::Validation(format!("{choice} is not a valid option")));
    }

    sqlx::query(
        "INSERT INTO votes (prop_id, agent, choice, reason, created_at_ms) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(prop_id, agent) DO UPDATE SET choice = excluded.choice, reason = excluded.reason, created_at_ms = excluded.created_at_ms",
    )
    .bind(proposal_id)
    .bind(agent)
    .bind(choice)
    .bind(&reason)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    let vote_rows = sqlx::query("SELECT agent, choice FROM votes WHERE prop_id = ?")
        .bind(proposal_id)
        .fetch_all(&mut *tx)
        .await?;
    let votes: BTreeMap<String, String> = vote_rows
        .into_iter()
        .map(|r| Ok::<_, StorageError>((r.try_get("agent")?, r.try_get("choice")?)))
        .collect::<Result<_>>()?;

    if let Some(result) = resolve(proposal.resolution, &proposal.options, &votes, eligible_count) {
        sqlx::query(
            "UPDATE proposals SET status = ?, result = ?, resolved_at_ms = ? WHERE prop_id = ?",
        )
        .bind(ProposalStatus::Resolved.as_str())
        .bind(&result)
        .bind(now_ms)
        .bind(proposal_id)
        .execute(&mut *tx)
        .await?;
        proposal.status = ProposalStatus::Resolved;
        proposal.result = Some(result);
        proposal.resolved_at_ms = Some(now_ms);
    }

    tx.commit().await?;
    Ok(proposal)
}

/// Cancel a proposal. Only its creator may cancel it, and only while active.
pub async fn cancel(pool: &SqlitePool, proposal_id: &str, requester: &str) -> Result<()> {
    let proposal = get(pool, proposal_id)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("proposal {proposal_id}")))?;
    if proposal.creator != requester {
        return Err(StorageError::Validation(
            "only the creator can cancel a proposal".into(),
        ));
    }
    if proposal.status != ProposalStatus::Active {
        return Err(StorageError::Validation(format!(
            "proposal {proposal_id} is not active"
        )));
    }
    sqlx::query("UPDATE proposals SET status = ? WHERE prop_id = ?")
        .bind(ProposalStatus::Cancelled.as_str())
        .bind(proposal_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_proposal(row: sqlx::sqlite::SqliteRow) -> Result<Proposal> {
    let proposal_type: String = row.try_get("proposal_type")?;
    let options_json: String = row.try_get("options")?;
    let resolution: String = row.try_get("resolution")?;
    let status: String = row.try_get("status")?;
    Ok(Proposal {
        id: ProposalId::new(row.try_get::<String, _>("prop_id")?),
        scope: Scope::new(row.try_get::<String, _>("workflow")?, row.try_get::<String, _>("tag")?),
        proposal_type: ProposalType::parse(&proposal_type)
            .ok_or_else(|| StorageError::Validation(format!("bad proposal type {proposal_type}")))?,
        title: row.try_get("title")?,
        options: serde_json::from_str(&options_json)?,
        resolution: ResolutionRule::parse(&resolution)
            .ok_or_else(|| StorageError::Validation(format!("bad resolution rule {resolution}")))?,
        binding: row.try_get("binding")?,
        status: ProposalStatus::parse(&status)
            .ok_or_else(|| StorageError::Validation(format!("bad proposal status {status}")))?,
        creator: row.try_get("creator")?,
        result: row.try_get("result")?,
        created_at_ms: row.try_get("created_at_ms")?,
        resolved_at_ms: row.try_get("resolved_at_ms")?,
    })
}

#[cfg(test)]
#[path = "proposals_tests.rs"]
mod tests;
