// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn global_scope_is_global_main() {
    let s = Scope::global();
    assert_eq!(s.workflow, "global");
    assert_eq!(s.tag, "main");
    assert!(s.is_global());
}

#[test]
fn non_global_scope_is_not_global() {
    assert!(!Scope::new("review", "pr-1").is_global());
}

#[test]
fn display_uses_colon_separator() {
    assert_eq!(Scope::new("review", "pr-1").to_string(), "review:pr-1");
}
