// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::registry::{create_agent, CreateAgentInput};
use crate::Db;

async fn db_with_team(members: &[&str]) -> Db {
    let db = Db::open_in_memory().await.unwrap();
    for (i, name) in members.iter().enumerate() {
        create_agent(
            db.pool(),
            CreateAgentInput {
                name: name.to_string(),
                workflow: Some("review".into()),
                tag: Some("pr-1".into()),
                model: "gpt-5".into(),
                ..Default::default()
            },
            i as i64,
        )
        .await
        .unwrap();
    }
    db
}

fn gen_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// S1 — mention fan-out.
#[tokio::test]
async fn mention_fan_out_delivers_only_to_mentioned_agent() {
    let db = db_with_team(&["alice", "bob", "charlie"]).await;
    let result = channel_send(
        db.pool(),
        "alice",
        "@bob please review",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    assert_eq!(result.recipients, vec!["bob".to_string()]);

    let bob_inbox = inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert_eq!(bob_inbox.len(), 1);
    let charlie_inbox = inbox_query(db.pool(), "charlie", "review", "pr-1").await.unwrap();
    assert!(charlie_inbox.is_empty());
}

// S2 — @all expansion.
#[tokio::test]
async fn all_mention_expands_to_every_member_except_sender() {
    let db = db_with_team(&["alice", "bob", "charlie"]).await;
    let result = channel_send(
        db.pool(),
        "alice",
        "@all sync up",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let mut recipients = result.recipients;
    recipients.sort();
    assert_eq!(recipients, vec!["bob".to_string(), "charlie".to_string()]);

    assert_eq!(
        inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap().len(),
        1
    );
    assert_eq!(
        inbox_query(db.pool(), "charlie", "review", "pr-1")
            .await
            .unwrap()
            .len(),
        1
    );
}

// S3 — auto-resource.
#[tokio::test]
async fn oversize_message_is_auto_resourced() {
    let db = db_with_team(&["alice", "bob"]).await;
    let big = "x".repeat(1500);
    channel_send(
        db.pool(),
        "alice",
        &big,
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();

    let messages = channel_read(db.pool(), "review", "pr-1", ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].content.starts_with("[Resource res_"));

    let id_start = messages[0].content.find("res_").unwrap();
    let id_end = messages[0].content.find(']').unwrap();
    let resource_id = &messages[0].content[id_start..id_end];
    let resource = resources::read_resource(db.pool(), resource_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resource.content, big);
}

#[tokio::test]
async fn message_at_threshold_is_stored_verbatim() {
    let db = db_with_team(&["alice", "bob"]).await;
    let exactly = "x".repeat(conclave_core::RESOURCE_THRESHOLD);
    channel_send(
        db.pool(),
        "alice",
        &exactly,
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let messages = channel_read(db.pool(), "review", "pr-1", ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(messages[0].content, exactly);
}

#[tokio::test]
async fn skip_auto_resource_delivers_kickoff_verbatim() {
    let db = db_with_team(&["alice", "bob"]).await;
    let big = "x".repeat(1500);
    channel_send(
        db.pool(),
        "system",
        &big,
        "review",
        "pr-1",
        SendOptions {
            skip_auto_resource: true,
            kind: Some(MessageKind::System),
            ..Default::default()
        },
        gen_id,
        10,
    )
    .await
    .unwrap();
    let messages = channel_read(db.pool(), "review", "pr-1", ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(messages[0].content, big);
}

// S6 — cursor correctness under same-millisecond inserts.
#[tokio::test]
async fn cursor_orders_messages_by_sequence_not_timestamp() {
    let db = db_with_team(&["alice", "bob"]).await;
    for _ in 0..3 {
        channel_send(
            db.pool(),
            "alice",
            "@bob ping",
            "review",
            "pr-1",
            SendOptions::default(),
            gen_id,
            // identical timestamp for all three inserts
            10,
        )
        .await
        .unwrap();
    }
    let inbox = inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert_eq!(inbox.len(), 3);
    assert!(inbox[0].message.sequence < inbox[1].message.sequence);
    assert!(inbox[1].message.sequence < inbox[2].message.sequence);

    inbox_ack(db.pool(), "bob", "review", "pr-1", &inbox[0].message.id)
        .await
        .unwrap();
    let remaining = inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert_eq!(remaining.len(), 2);
}

// S7 — DM visibility.
#[tokio::test]
async fn direct_message_is_hidden_from_non_participants() {
    let db = db_with_team(&["alice", "bob", "charlie"]).await;
    channel_send(
        db.pool(),
        "alice",
        "secret",
        "review",
        "pr-1",
        SendOptions {
            to: Some("bob".into()),
            ..Default::default()
        },
        gen_id,
        10,
    )
    .await
    .unwrap();

    let for_charlie = channel_read(
        db.pool(),
        "review",
        "pr-1",
        ReadOptions {
            agent: Some("charlie".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(for_charlie.is_empty());

    for viewer in ["alice", "bob"] {
        let visible = channel_read(
            db.pool(),
            "review",
            "pr-1",
            ReadOptions {
                agent: Some(viewer.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(visible.len(), 1);
    }
}

#[tokio::test]
async fn direct_message_to_override_ignores_mentions() {
    let db = db_with_team(&["alice", "bob", "charlie"]).await;
    let result = channel_send(
        db.pool(),
        "alice",
        "@charlie actually this goes to bob",
        "review",
        "pr-1",
        SendOptions {
            to: Some("bob".into()),
            ..Default::default()
        },
        gen_id,
        10,
    )
    .await
    .unwrap();
    assert_eq!(result.recipients, vec!["bob".to_string()]);
}

#[tokio::test]
async fn ack_all_advances_to_last_qualifying_message() {
    let db = db_with_team(&["alice", "bob"]).await;
    for _ in 0..3 {
        channel_send(
            db.pool(),
            "alice",
            "@bob ping",
            "review",
            "pr-1",
            SendOptions::default(),
            gen_id,
            10,
        )
        .await
        .unwrap();
    }
    inbox_ack_all(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert!(inbox_query(db.pool(), "bob", "review", "pr-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn ack_all_on_empty_inbox_is_a_no_op() {
    let db = db_with_team(&["alice", "bob"]).await;
    inbox_ack_all(db.pool(), "bob", "review", "pr-1").await.unwrap();
}

#[tokio::test]
async fn ack_twice_equals_ack_once() {
    let db = db_with_team(&["alice", "bob"]).await;
    channel_send(
        db.pool(),
        "alice",
        "@bob ping",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let entry = &inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap()[0];
    let id = entry.message.id.clone();
    inbox_ack(db.pool(), "bob", "review", "pr-1", &id).await.unwrap();
    inbox_ack(db.pool(), "bob", "review", "pr-1", &id).await.unwrap();
    assert!(inbox_query(db.pool(), "bob", "review", "pr-1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn high_priority_for_broadcast_or_urgent_keyword() {
    let db = db_with_team(&["alice", "bob", "charlie"]).await;
    channel_send(
        db.pool(),
        "alice",
        "@all this is urgent",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let inbox = inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert_eq!(inbox[0].priority, Priority::High);
}

#[tokio::test]
async fn normal_priority_for_single_recipient_non_urgent() {
    let db = db_with_team(&["alice", "bob"]).await;
    channel_send(
        db.pool(),
        "alice",
        "@bob status update please",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let inbox = inbox_query(db.pool(), "bob", "review", "pr-1").await.unwrap();
    assert_eq!(inbox[0].priority, Priority::Normal);
}

#[tokio::test]
async fn since_cursor_excludes_earlier_messages() {
    let db = db_with_team(&["alice", "bob"]).await;
    channel_send(
        db.pool(),
        "alice",
        "@bob first",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        10,
    )
    .await
    .unwrap();
    let first_read = channel_read(db.pool(), "review", "pr-1", ReadOptions::default())
        .await
        .unwrap();
    let first_id = first_read[0].id.clone();

    channel_send(
        db.pool(),
        "alice",
        "@bob second",
        "review",
        "pr-1",
        SendOptions::default(),
        gen_id,
        11,
    )
    .await
    .unwrap();

    let since_first = channel_read(
        db.pool(),
        "review",
        "pr-1",
        ReadOptions {
            since: Some(first_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(since_first.len(), 1);
    assert!(since_first[0].content.contains("second"));
}
