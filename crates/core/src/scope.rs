// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `(workflow, tag)` pair: the unit every channel, inbox, document root
//! and proposal pool is scoped to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the implicit workflow that owns standalone agents.
pub const GLOBAL_WORKFLOW: &str = "global";

/// Tag of the implicit workflow instance that owns standalone agents.
pub const MAIN_TAG: &str = "main";

/// Synthetic recipient token meaning "every member of the workflow instance".
pub const ALL_RECIPIENTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub workflow: String,
    pub tag: String,
}

impl Scope {
    pub fn new(workflow: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            tag: tag.into(),
        }
    }

    /// The implicit `(global, main)` instance.
    pub fn global() -> Self {
        Self::new(GLOBAL_WORKFLOW, MAIN_TAG)
    }

    pub fn is_global(&self) -> bool {
        self.workflow == GLOBAL_WORKFLOW && self.tag == MAIN_TAG
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.workflow, self.tag)
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
