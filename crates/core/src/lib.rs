// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! conclave-core: domain types shared by every kernel crate.
//!
//! Nothing in this crate touches the filesystem, the network, or a clock
//! other than through the [`Clock`] abstraction. It exists so that
//! `conclave-storage`, `conclave-process`, `conclave-scheduler` and
//! `conclave-daemon` can agree on the shape of an agent, a message, a
//! resource and a proposal without depending on one another.

pub mod agent;
pub mod clock;
pub mod id;
pub mod mention;
pub mod message;
pub mod proposal;
pub mod resource;
pub mod scope;
pub mod workflow;
pub mod worker;

pub use agent::{AgentBackend, AgentSchedule, AgentSpec, AgentState, ProviderConfig};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{short_suffix, IdGen, ShortId, UuidIdGen};
pub use mention::parse_mentions;
pub use message::{is_urgent, Message, MessageKind, Priority, SendOptions};
pub use proposal::{Proposal, ProposalStatus, ProposalType, ResolutionRule, Vote};
pub use resource::{ContentType, Resource};
pub use scope::Scope;
pub use workflow::{Workflow, WorkflowState};
pub use worker::{Worker, WorkerState};

/// Default poll interval for a scheduler that found an empty inbox.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Default worker idle timeout.
pub const DEFAULT_WORKER_IDLE_TIMEOUT_S: u64 = 180;

/// Number of consecutive worker failures before the scheduler force-acks
/// the inbox to break an infinite crash loop.
pub const MAX_RETRIES: u32 = 3;

/// Messages longer than this many UTF-8 code units are auto-resourced.
pub const RESOURCE_THRESHOLD: usize = 1_200;

/// Length of the verbatim prefix kept in the rewritten `[Resource <id>]: ...` body.
pub const RESOURCE_PREVIEW_CHARS: usize = 200;

crate::define_id! {
    /// Opaque message identifier.
    pub struct MessageId;
}

crate::define_id! {
    /// Opaque resource identifier, always rendered with a `res_` prefix.
    pub struct ResourceId;
}

crate::define_id! {
    /// Opaque proposal identifier, always rendered with a `prop_` prefix.
    pub struct ProposalId;
}
