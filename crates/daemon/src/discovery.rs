// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery file: a small JSON breadcrumb clients use to find the running
//! daemon (spec.md §6, "Discovery file"). Advisory only — the actual
//! mutual-exclusion guarantee is the lock file in [`crate::lifecycle`].

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub pid: u32,
    pub host: String,
    pub port: u16,
    pub started_at_ms: i64,
}

/// Write the discovery file, overwriting any stale one left behind by a
/// previous crashed daemon.
pub fn write(path: &Path, record: &DiscoveryRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec_pretty(record).unwrap_or_default();
    std::fs::write(path, body)
}

/// Best-effort removal on shutdown; absence is not an error.
pub fn remove(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Read a discovery file and report whether its `pid` is still alive
/// (checked via a signal-0 probe). A record whose process is gone is
/// stale and callers should treat it as "no daemon running".
pub fn read(path: &Path) -> Option<DiscoveryRecord> {
    let body = std::fs::read(path).ok()?;
    let record: DiscoveryRecord = serde_json::from_slice(&body).ok()?;
    if is_alive(record.pid) {
        Some(record)
    } else {
        None
    }
}

fn is_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
