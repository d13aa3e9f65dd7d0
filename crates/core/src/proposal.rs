// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proposal (vote) domain types and the pure resolution rule.
//!
//! Resolution is a pure function of vote counts so it can be unit-tested
//! without a database: `conclave-storage::proposals` calls [`resolve`]
//! after every upserted vote and persists the result if one comes back.

use crate::scope::Scope;
use crate::ProposalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    Election,
    Decision,
    Approval,
    Assignment,
}

impl ProposalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalType::Election => "election",
            ProposalType::Decision => "decision",
            ProposalType::Approval => "approval",
            ProposalType::Assignment => "assignment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "election" => Some(Self::Election),
            "decision" => Some(Self::Decision),
            "approval" => Some(Self::Approval),
            "assignment" => Some(Self::Assignment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    Plurality,
    Majority,
    Unanimous,
}

impl Default for ResolutionRule {
    fn default() -> Self {
        Self::Plurality
    }
}

impl ResolutionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionRule::Plurality => "plurality",
            ResolutionRule::Majority => "majority",
            ResolutionRule::Unanimous => "unanimous",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plurality" => Some(Self::Plurality),
            "majority" => Some(Self::Majority),
            "unanimous" => Some(Self::Unanimous),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Active,
    Resolved,
    Expired,
    Cancelled,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Resolved => "resolved",
            ProposalStatus::Expired => "expired",
            ProposalStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub scope: Scope,
    pub proposal_type: ProposalType,
    pub title: String,
    pub options: Vec<String>,
    pub resolution: ResolutionRule,
    pub binding: bool,
    pub status: ProposalStatus,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub created_at_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: ProposalId,
    pub agent: String,
    pub choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at_ms: i64,
}

/// Decide whether the current tally resolves the proposal, per spec.md
/// §4.5. `eligible_count` is the number of agents currently in scope (or
/// the total votes cast, if that is zero). Ties break alphabetically by
/// option string for determinism (the Open Question in spec.md §9,
/// resolved this way — see DESIGN.md).
pub fn resolve(
    rule: ResolutionRule,
    options: &[String],
    votes: &BTreeMap<String, String>,
    eligible_count: usize,
) -> Option<String> {
    let votes_cast = votes.len();
    if votes_cast == 0 {
        return None;
    }

    let mut counts: BTreeMap<&str, usize> = options.iter().map(|o| (o.as_str(), 0)).collect();
    for choice in votes.values() {
        *counts.entry(choice.as_str()).or_insert(0) += 1;
    }

    let top_count = *counts.values().max().unwrap_or(&0);
    let top = counts
        .iter()
        .filter(|(_, &c)| c == top_count)
        .map(|(name, _)| *name)
        .min()?
        .to_string();

    let eligible = if eligible_count == 0 {
        votes_cast
    } else {
        eligible_count
    };

    match rule {
        ResolutionRule::Plurality => {
            if votes_cast >= 2 {
                Some(top)
            } else {
                None
            }
        }
        ResolutionRule::Majority => {
            if top_count * 2 > eligible {
                Some(top)
            } else {
                None
            }
        }
        ResolutionRule::Unanimous => {
            if top_count == eligible && votes_cast == eligible {
                Some(top)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "proposal_tests.rs"]
mod tests;
