// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and read operations. Messages are append-only.

use std::str::FromStr;

use rusqlite::params;
use wicket_core::types::{ChatMessage, MessageRole};
use wicket_core::WicketError;

use crate::database::{map_tr_err, Database};
use crate::queries::{fmt_ts, parse_ts};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let role_str: String = row.get(2)?;
    let role = MessageRole::from_str(&role_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ChatMessage {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        created_at: parse_ts(4, &row.get::<_, String>(4)?)?,
    })
}

/// Append a message.
pub async fn append_message(db: &Database, message: &ChatMessage) -> Result<(), WicketError> {
    let m = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    m.id,
                    m.conversation_id,
                    m.role.to_string(),
                    m.content,
                    fmt_ts(m.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in chronological order.
///
/// The rowid tiebreaker keeps same-millisecond messages in append order.
pub async fn messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ChatMessage>, WicketError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, role, content, created_at
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                    // The limited query walks newest-first; flip back to
                    // chronological for callers.
                    messages.reverse();
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, role, content, created_at
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use wicket_core::types::{ClientParams, Conversation};

    async fn setup_with_conversation(id: &str) -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let conv = Conversation::new(
            id.to_string(),
            format!("chat-{id}"),
            format!("v-{id}"),
            ClientParams::default(),
            Utc::now(),
        );
        crate::queries::conversations::create_conversation(&db, &conv)
            .await
            .unwrap();
        (db, dir)
    }

    fn make_message(id: &str, conversation_id: &str, role: MessageRole) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: format!("content {id}"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_and_read_chronological() {
        let (db, _dir) = setup_with_conversation("c-1").await;

        append_message(&db, &make_message("m-1", "c-1", MessageRole::User))
            .await
            .unwrap();
        append_message(&db, &make_message("m-2", "c-1", MessageRole::Ai))
            .await
            .unwrap();
        append_message(&db, &make_message("m-3", "c-1", MessageRole::Operator))
            .await
            .unwrap();

        let messages = messages_for_conversation(&db, "c-1", None).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, "m-1");
        assert_eq!(messages[1].id, "m-2");
        assert_eq!(messages[2].id, "m-3");
        assert_eq!(messages[1].role, MessageRole::Ai);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn limit_returns_most_recent_in_order() {
        let (db, _dir) = setup_with_conversation("c-2").await;

        for i in 0..5 {
            append_message(&db, &make_message(&format!("m-{i}"), "c-2", MessageRole::User))
                .await
                .unwrap();
        }

        let messages = messages_for_conversation(&db, "c-2", Some(2)).await.unwrap();
        assert_eq!(messages.len(), 2);
        // The two newest, still chronological.
        assert_eq!(messages[0].id, "m-3");
        assert_eq!(messages[1].id, "m-4");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_conversation_has_no_messages() {
        let (db, _dir) = setup_with_conversation("c-3").await;
        let messages = messages_for_conversation(&db, "c-3", None).await.unwrap();
        assert!(messages.is_empty());
        db.close().await.unwrap();
    }
}
