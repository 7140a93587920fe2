// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Wicket workspace.
//!
//! Conversations and messages are explicit typed records carrying a
//! `schema_version` field; [`Conversation::validate`] is called on every read
//! so malformed or future-versioned rows are rejected instead of trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::WicketError;

/// Schema version written into newly created conversation records.
pub const SCHEMA_VERSION: i64 = 1;

/// Identifies the type of adapter behind a seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Storage,
    Assistant,
    Identity,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Lifecycle status of a conversation.
///
/// `ai` -> `pending` -> `active` -> `inactive` -> `ended` is the forward
/// path; `archived` is the administrative terminal. The allowed transitions
/// are encoded in `wicket-engine`'s lifecycle module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// The automated assistant is in control.
    Ai,
    /// A handoff has been requested; waiting for an operator (or for the
    /// visitor to confirm the handoff offer).
    Pending,
    /// A human operator owns the conversation.
    Active,
    /// Idle beyond the short threshold; control unspecified until new activity.
    Inactive,
    /// Closed, normally or by timeout. Terminal.
    Ended,
    /// Administratively hidden. Terminal.
    Archived,
}

impl ConversationStatus {
    /// Terminal statuses are never swept or written to again by the core.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversationStatus::Ended | ConversationStatus::Archived)
    }
}

/// Role of a chat message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Ai,
    Operator,
    System,
}

/// Which side of the conversation a typing signal belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TypingParty {
    Visitor,
    Operator,
}

/// Intent label for a visitor reply to a handoff offer.
///
/// Produced by the external classifier; any classifier failure maps to
/// [`HandoffIntent::Other`] so the conversation is never blocked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HandoffIntent {
    Positive,
    Negative,
    Other,
}

/// Ephemeral typing presence. Advisory only -- a stale `last_update` is
/// treated as "not typing" regardless of the stored booleans, and typing
/// state never drives status transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypingState {
    pub visitor: bool,
    pub operator: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// Opaque client parameters passed through from the embedding page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientParams {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub shop_id: Option<String>,
}

/// A support conversation between a visitor, the assistant, and optionally
/// a human operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque identifier, stable for the conversation's lifetime.
    pub id: String,
    /// Caller-supplied chat identifier used for session resumption. At most
    /// one non-ended conversation per external id at a time.
    pub external_id: String,
    /// Anonymous identity bound to this conversation; immutable after creation.
    pub visitor_id: String,
    pub status: ConversationStatus,
    /// True only while awaiting the visitor's yes/no to a handoff offer.
    pub handoff_confirmation_pending: bool,
    /// The operator currently owning the conversation; set only in `active`.
    pub operator_id: Option<String>,
    /// Denormalized cache of the most recent message content.
    pub last_message: Option<String>,
    /// Server-assigned timestamp of the most recent message, monotonically
    /// non-decreasing. Idle calculations use this field, never client clocks.
    pub last_message_at: Option<DateTime<Utc>>,
    pub typing: TypingState,
    /// Messages the operator has not yet seen; reset when an operator sends.
    pub unread_count: i64,
    /// Generated lazily once enough context exists.
    pub title: Option<String>,
    /// Confidence signal from the last assistant turn.
    pub confidence_score: Option<f64>,
    pub client: ClientParams,
    pub schema_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a fresh conversation in `ai` state.
    pub fn new(
        id: String,
        external_id: String,
        visitor_id: String,
        client: ClientParams,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            external_id,
            visitor_id,
            status: ConversationStatus::Ai,
            handoff_confirmation_pending: false,
            operator_id: None,
            last_message: None,
            last_message_at: None,
            typing: TypingState::default(),
            unread_count: 0,
            title: None,
            confidence_score: None,
            client,
            schema_version: SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate a record read back from storage.
    ///
    /// Rejects unknown schema versions and the illegal flag state
    /// (`handoff_confirmation_pending` while status is not `pending`).
    pub fn validate(&self) -> Result<(), WicketError> {
        if self.schema_version > SCHEMA_VERSION || self.schema_version < 1 {
            return Err(WicketError::Internal(format!(
                "conversation {}: unsupported schema version {}",
                self.id, self.schema_version
            )));
        }
        if self.handoff_confirmation_pending && self.status != ConversationStatus::Pending {
            return Err(WicketError::Internal(format!(
                "conversation {}: handoff confirmation pending while status is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Time since the last message, falling back to the creation time for
    /// conversations that never received one.
    pub fn idle_since(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_message_at.unwrap_or(self.created_at)
    }
}

/// A single message in a conversation. Append-only; never mutated or
/// deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Server-assigned; per-conversation ordering is backed by the storage
    /// rowid as a tiebreaker.
    pub created_at: DateTime<Utc>,
}

/// Increment-or-reset operation on a conversation's unread counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadCounter {
    Increment,
    Reset,
}

/// Partial-field update applied to a conversation.
///
/// Every durable mutation goes through this record so that concurrent
/// writers touching disjoint fields (title generation vs. a status sweep)
/// cannot clobber each other. Same-field races resolve last-write-wins on
/// server timestamps; there is no application-level locking.
#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub status: Option<ConversationStatus>,
    pub handoff_confirmation_pending: Option<bool>,
    /// `Some(None)` clears the operator; `Some(Some(id))` assigns one.
    pub operator_id: Option<Option<String>>,
    pub last_message: Option<(String, DateTime<Utc>)>,
    pub title: Option<String>,
    pub confidence_score: Option<f64>,
    pub unread: Option<UnreadCounter>,
}

impl ConversationUpdate {
    /// True when no field is set; stores may skip the write entirely.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.handoff_confirmation_pending.is_none()
            && self.operator_id.is_none()
            && self.last_message.is_none()
            && self.title.is_none()
            && self.confidence_score.is_none()
            && self.unread.is_none()
    }

    pub fn status(status: ConversationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// An anonymous visitor identity created by the identity issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorIdentity {
    pub visitor_id: String,
}

/// A short-lived auth token bound to a visitor identity.
///
/// Tokens are never persisted; one is freshly minted on every bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// One turn of conversation context handed to the assistant.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub role: MessageRole,
    pub content: String,
}

/// A completed assistant reply.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    /// Self-reported confidence in `[0, 1]`, when the provider supplies one.
    pub confidence: Option<f64>,
}
