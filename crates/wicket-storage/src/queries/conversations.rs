// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD, partial-field updates, and the batched stale-close.

use std::str::FromStr;

use rusqlite::{params, OptionalExtension, ToSql};
use wicket_core::types::{
    ClientParams, Conversation, ConversationStatus, ConversationUpdate, TypingParty, TypingState,
    UnreadCounter,
};
use wicket_core::{MessageRole, WicketError};

use chrono::{DateTime, Utc};

use crate::database::{map_tr_err, Database};
use crate::queries::{fmt_ts, parse_ts};

const COLUMNS: &str = "id, external_id, visitor_id, status, handoff_confirmation_pending, \
     operator_id, last_message, last_message_at, typing_visitor, typing_operator, \
     typing_updated_at, unread_count, title, confidence_score, client_user_id, \
     client_user_name, client_shop_id, schema_version, created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let status_str: String = row.get(3)?;
    let status = ConversationStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let last_message_at: Option<String> = row.get(7)?;
    let typing_updated_at: Option<String> = row.get(10)?;

    Ok(Conversation {
        id: row.get(0)?,
        external_id: row.get(1)?,
        visitor_id: row.get(2)?,
        status,
        handoff_confirmation_pending: row.get::<_, i64>(4)? != 0,
        operator_id: row.get(5)?,
        last_message: row.get(6)?,
        last_message_at: last_message_at
            .map(|s| parse_ts(7, &s))
            .transpose()?,
        typing: TypingState {
            visitor: row.get::<_, i64>(8)? != 0,
            operator: row.get::<_, i64>(9)? != 0,
            last_update: typing_updated_at
                .map(|s| parse_ts(10, &s))
                .transpose()?,
        },
        unread_count: row.get(11)?,
        title: row.get(12)?,
        confidence_score: row.get(13)?,
        client: ClientParams {
            user_id: row.get(14)?,
            user_name: row.get(15)?,
            shop_id: row.get(16)?,
        },
        schema_version: row.get(17)?,
        created_at: parse_ts(18, &row.get::<_, String>(18)?)?,
        updated_at: parse_ts(19, &row.get::<_, String>(19)?)?,
    })
}

/// Insert a freshly created conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), WicketError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, external_id, visitor_id, status, \
                 handoff_confirmation_pending, operator_id, last_message, last_message_at, \
                 typing_visitor, typing_operator, typing_updated_at, unread_count, title, \
                 confidence_score, client_user_id, client_user_name, client_shop_id, \
                 schema_version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17, ?18, ?19, ?20)",
                params![
                    c.id,
                    c.external_id,
                    c.visitor_id,
                    c.status.to_string(),
                    c.handoff_confirmation_pending as i64,
                    c.operator_id,
                    c.last_message,
                    c.last_message_at.map(fmt_ts),
                    c.typing.visitor as i64,
                    c.typing.operator as i64,
                    c.typing.last_update.map(fmt_ts),
                    c.unread_count,
                    c.title,
                    c.confidence_score,
                    c.client.user_id,
                    c.client.user_name,
                    c.client.shop_id,
                    c.schema_version,
                    fmt_ts(c.created_at),
                    fmt_ts(c.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, WicketError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1");
            let result = conn
                .query_row(&sql, params![id], row_to_conversation)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(map_tr_err)
}

/// Find the newest non-terminal conversation bound to an external chat id.
pub async fn find_active_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Conversation>, WicketError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE external_id = ?1 AND status NOT IN ('ended', 'archived')
                 ORDER BY created_at DESC LIMIT 1"
            );
            let result = conn
                .query_row(&sql, params![external_id], row_to_conversation)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial-field update.
///
/// Only the fields present in `update` appear in the `SET` clause, so
/// concurrent writers touching disjoint fields never clobber each other.
/// `updated_at` is stamped server-side on every write.
pub async fn apply_update(
    db: &Database,
    id: &str,
    update: ConversationUpdate,
) -> Result<(), WicketError> {
    if update.is_empty() {
        return Ok(());
    }
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(status) = update.status {
                sets.push("status = ?".into());
                values.push(Box::new(status.to_string()));
            }
            if let Some(flag) = update.handoff_confirmation_pending {
                sets.push("handoff_confirmation_pending = ?".into());
                values.push(Box::new(flag as i64));
            }
            if let Some(operator) = update.operator_id {
                sets.push("operator_id = ?".into());
                values.push(Box::new(operator));
            }
            if let Some((text, at)) = update.last_message {
                sets.push("last_message = ?".into());
                values.push(Box::new(text));
                sets.push("last_message_at = ?".into());
                values.push(Box::new(fmt_ts(at)));
            }
            if let Some(title) = update.title {
                sets.push("title = ?".into());
                values.push(Box::new(title));
            }
            if let Some(score) = update.confidence_score {
                sets.push("confidence_score = ?".into());
                values.push(Box::new(score));
            }
            match update.unread {
                Some(UnreadCounter::Increment) => {
                    sets.push("unread_count = unread_count + 1".into());
                }
                Some(UnreadCounter::Reset) => {
                    sets.push("unread_count = 0".into());
                }
                None => {}
            }
            sets.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')".into());

            let sql = format!("UPDATE conversations SET {} WHERE id = ?", sets.join(", "));
            values.push(Box::new(id));
            let n = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(WicketError::NotFound {
            entity: "conversation",
            id: id_for_err,
        });
    }
    Ok(())
}

/// List conversations, optionally filtered by status, newest activity first.
pub async fn list_conversations(
    db: &Database,
    status: Option<ConversationStatus>,
) -> Result<Vec<Conversation>, WicketError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut conversations = Vec::new();
            match &status {
                Some(status_filter) => {
                    let sql = format!(
                        "SELECT {COLUMNS} FROM conversations WHERE status = ?1
                         ORDER BY COALESCE(last_message_at, created_at) DESC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params![status_filter], row_to_conversation)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
                None => {
                    let sql = format!(
                        "SELECT {COLUMNS} FROM conversations
                         ORDER BY COALESCE(last_message_at, created_at) DESC"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([], row_to_conversation)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Conversations in one of `statuses` with no activity since `cutoff`.
///
/// Conversations that never received a message fall back to their creation
/// time, so an abandoned bootstrap still ages out.
pub async fn list_idle_since(
    db: &Database,
    statuses: &[ConversationStatus],
    cutoff: DateTime<Utc>,
) -> Result<Vec<Conversation>, WicketError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }
    let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    let cutoff = fmt_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            let sql = format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE status IN ({placeholders})
                   AND COALESCE(last_message_at, created_at) < ?
                 ORDER BY COALESCE(last_message_at, created_at) ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut bind: Vec<&dyn ToSql> = statuses
                .iter()
                .map(|s| s as &dyn ToSql)
                .collect();
            bind.push(&cutoff);
            let rows = stmt.query_map(rusqlite::params_from_iter(bind), row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Close a batch of conversations in a single transaction.
///
/// Each id is re-checked inside the transaction: still non-terminal, and the
/// cached `last_message` differs from `ended_text`. Rows failing either
/// check are skipped, which makes repeated sweeps of the same batch a
/// no-op with exactly one system message per conversation.
pub async fn close_batch(
    db: &Database,
    ids: &[String],
    ended_text: &str,
    now: DateTime<Utc>,
) -> Result<usize, WicketError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let ids = ids.to_vec();
    let ended_text = ended_text.to_string();
    let now_str = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut closed = 0usize;
            for id in &ids {
                let row: Option<(String, Option<String>)> = tx
                    .query_row(
                        "SELECT status, last_message FROM conversations WHERE id = ?1",
                        params![id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((status_str, last_message)) = row else {
                    continue;
                };
                let status = ConversationStatus::from_str(&status_str).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                if status.is_terminal() {
                    continue;
                }
                if last_message.as_deref() == Some(ended_text.as_str()) {
                    continue;
                }
                tx.execute(
                    "UPDATE conversations
                     SET status = ?2, last_message = ?3, last_message_at = ?4, updated_at = ?4
                     WHERE id = ?1",
                    params![
                        id,
                        ConversationStatus::Ended.to_string(),
                        ended_text,
                        now_str
                    ],
                )?;
                tx.execute(
                    "INSERT INTO messages (id, conversation_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        uuid::Uuid::new_v4().to_string(),
                        id,
                        MessageRole::System.to_string(),
                        ended_text,
                        now_str
                    ],
                )?;
                closed += 1;
            }
            tx.commit()?;
            Ok(closed)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a typing signal. Advisory; last write wins.
pub async fn set_typing(
    db: &Database,
    id: &str,
    party: TypingParty,
    is_typing: bool,
    now: DateTime<Utc>,
) -> Result<(), WicketError> {
    let id = id.to_string();
    let now_str = fmt_ts(now);
    let column = match party {
        TypingParty::Visitor => "typing_visitor",
        TypingParty::Operator => "typing_operator",
    };
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "UPDATE conversations SET {column} = ?1, typing_updated_at = ?2 WHERE id = ?3"
            );
            conn.execute(&sql, params![is_typing as i64, now_str, id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
