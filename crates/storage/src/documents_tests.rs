// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn provider() -> (DocumentProvider, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (DocumentProvider::new(dir.path()), dir)
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let (docs, _tmp) = provider();
    docs.write("review", "pr-1", "notes.md", "hello").await.unwrap();
    let content = docs.read("review", "pr-1", "notes.md").await.unwrap();
    assert_eq!(content, Some("hello".to_string()));
}

#[tokio::test]
async fn read_of_missing_document_is_none() {
    let (docs, _tmp) = provider();
    let content = docs.read("review", "pr-1", "missing.md").await.unwrap();
    assert_eq!(content, None);
}

#[tokio::test]
async fn write_creates_parent_directories() {
    let (docs, _tmp) = provider();
    docs.write("review", "pr-1", "nested/deep/notes.md", "x").await.unwrap();
    assert_eq!(
        docs.read("review", "pr-1", "nested/deep/notes.md").await.unwrap(),
        Some("x".to_string())
    );
}

#[tokio::test]
async fn append_accumulates_content() {
    let (docs, _tmp) = provider();
    docs.append("review", "pr-1", "log.txt", "first\n").await.unwrap();
    docs.append("review", "pr-1", "log.txt", "second\n").await.unwrap();
    let content = docs.read("review", "pr-1", "log.txt").await.unwrap().unwrap();
    assert_eq!(content, "first\nsecond\n");
}

#[tokio::test]
async fn append_creates_file_if_absent() {
    let (docs, _tmp) = provider();
    docs.append("review", "pr-1", "fresh.txt", "only\n").await.unwrap();
    assert_eq!(
        docs.read("review", "pr-1", "fresh.txt").await.unwrap(),
        Some("only\n".to_string())
    );
}

#[tokio::test]
async fn create_fails_if_target_exists() {
    let (docs, _tmp) = provider();
    docs.create("review", "pr-1", "plan.md", "v1").await.unwrap();
    let err = docs.create("review", "pr-1", "plan.md", "v2").await.unwrap_err();
    assert!(matches!(err, StorageError::Duplicate(_)));
    assert_eq!(
        docs.read("review", "pr-1", "plan.md").await.unwrap(),
        Some("v1".to_string())
    );
}

#[tokio::test]
async fn list_excludes_underscore_prefixed_directories() {
    let (docs, _tmp) = provider();
    docs.write("review", "pr-1", "visible.md", "a").await.unwrap();
    docs.write("review", "pr-1", "_internal/secret.md", "b").await.unwrap();
    docs.write("review", "pr-1", "public/child.md", "c").await.unwrap();

    let entries = docs.list("review", "pr-1", "").await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert!(names.contains(&"visible.md"));
    assert!(names.contains(&"public"));
    assert!(!names.contains(&"_internal"));
}

#[tokio::test]
async fn list_of_missing_directory_is_empty() {
    let (docs, _tmp) = provider();
    assert!(docs.list("review", "pr-1", "nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn documents_are_isolated_per_workflow_tag() {
    let (docs, _tmp) = provider();
    docs.write("review", "pr-1", "notes.md", "a").await.unwrap();
    docs.write("review", "pr-2", "notes.md", "b").await.unwrap();
    assert_eq!(
        docs.read("review", "pr-1", "notes.md").await.unwrap(),
        Some("a".to_string())
    );
    assert_eq!(
        docs.read("review", "pr-2", "notes.md").await.unwrap(),
        Some("b".to_string())
    );
}

#[tokio::test]
async fn path_traversal_is_rejected() {
    let (docs, _tmp) = provider();
    let err = docs.read("review", "pr-1", "../../etc/passwd").await.unwrap_err();
    assert!(matches!(err, StorageError::Validation(_)));
}
