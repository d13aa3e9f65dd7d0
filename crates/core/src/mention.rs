// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `@mention` parsing for channel messages.
//!
//! Parsing is total: malformed or absent mentions simply produce an empty
//! recipient list, never an error. Resolution happens once, at write time
//! (see `conclave-storage::context`); this module only extracts candidate
//! tokens from text.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static MENTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z][A-Za-z0-9_-]*)").expect("constant regex pattern is valid")
});

/// Extract `@name` tokens from `content`, restricted to names present in
/// `known` (case-sensitive) plus the synthetic `all` token. Duplicates
/// collapse, preserving first-appearance order.
pub fn parse_mentions(content: &str, known: &[impl AsRef<str>]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for cap in MENTION_PATTERN.captures_iter(content) {
        let name = &cap[1];
        let is_known = name == "all" || known.iter().any(|k| k.as_ref() == name);
        if is_known && seen.insert(name.to_string()) {
            out.push(name.to_string());
        }
    }
    out
}

#[cfg(test)]
#[path = "mention_tests.rs"]
mod tests;
