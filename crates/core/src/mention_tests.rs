// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const TEAM: &[&str] = &["alice", "bob", "charlie"];

#[test]
fn extracts_single_mention() {
    assert_eq!(parse_mentions("@bob please review", TEAM), vec!["bob"]);
}

#[test]
fn ignores_unknown_names() {
    assert_eq!(
        parse_mentions("@dave take a look", TEAM),
        Vec::<String>::new()
    );
}

#[test]
fn collapses_duplicates_preserving_first_appearance_order() {
    assert_eq!(
        parse_mentions("@bob @alice @bob again", TEAM),
        vec!["bob", "alice"]
    );
}

#[test]
fn matches_are_case_sensitive() {
    assert_eq!(parse_mentions("@Bob hi", TEAM), Vec::<String>::new());
}

#[test]
fn all_is_always_recognised() {
    assert_eq!(parse_mentions("@all sync up", TEAM), vec!["all"]);
}

#[test]
fn no_mention_produces_empty_list() {
    assert_eq!(
        parse_mentions("just a status update", TEAM),
        Vec::<String>::new()
    );
}

#[test]
fn email_like_text_does_not_spuriously_mention() {
    // "@" followed by a digit is not a valid mention token.
    assert_eq!(parse_mentions("user@123 reported this", TEAM), Vec::<String>::new());
}

yare::parameterized! {
    mention_token_boundary = {
        case("@bob,", vec!["bob"]),
        case("@bob.", vec!["bob"]),
        case("(@bob)", vec!["bob"]),
        case("@bob-ish", Vec::<String>::new()),
    }
}
fn mention_token_boundary(content: &str, expected: Vec<String>) {
    assert_eq!(parse_mentions(content, TEAM), expected);
}
