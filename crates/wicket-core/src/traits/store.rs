// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for persistence backends.
//!
//! The engine depends only on this pull-style interface; change
//! notification happens separately over the event bus. All durable
//! mutations are expressed as partial-field [`ConversationUpdate`]s so
//! concurrent writers on disjoint fields cannot clobber each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WicketError;
use crate::traits::adapter::Adapter;
use crate::types::{
    ChatMessage, Conversation, ConversationStatus, ConversationUpdate, TypingParty,
};

/// Persistence seam for conversations and their append-only messages.
#[async_trait]
pub trait ConversationStore: Adapter {
    /// Persist a freshly created conversation.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), WicketError>;

    /// Fetch a conversation by its id.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, WicketError>;

    /// Find the non-terminal conversation bound to an external chat id.
    ///
    /// This is the lookup-before-create dedup used by session bootstrap:
    /// ended and archived conversations are ignored so a returning visitor
    /// with a closed conversation gets a fresh one.
    async fn find_active_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Conversation>, WicketError>;

    /// Apply a partial-field update to a conversation.
    async fn apply_update(
        &self,
        id: &str,
        update: ConversationUpdate,
    ) -> Result<(), WicketError>;

    /// Append a message. Messages are never mutated or deleted.
    async fn append_message(&self, message: &ChatMessage) -> Result<(), WicketError>;

    /// Messages of a conversation in chronological order.
    async fn messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, WicketError>;

    /// List conversations, optionally filtered by status, newest first.
    async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, WicketError>;

    /// Conversations in one of `statuses` whose last activity is older than
    /// `cutoff`. Idle math always uses the server-assigned
    /// `last_message_at`, never client clocks.
    async fn list_idle_since(
        &self,
        statuses: &[ConversationStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, WicketError>;

    /// Close a batch of stale conversations in one atomic transaction.
    ///
    /// For each id that is still non-terminal and whose cached
    /// `last_message` differs from `ended_text`: set status `ended`, write
    /// the last-message cache, and append one system-role message with
    /// `ended_text`. Returns the number actually closed, which makes
    /// repeated sweeps of the same conversations a no-op.
    async fn close_batch(
        &self,
        ids: &[String],
        ended_text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, WicketError>;

    /// Record a typing signal. Advisory; outside the durability guarantees
    /// of the other fields.
    async fn set_typing(
        &self,
        conversation_id: &str,
        party: TypingParty,
        is_typing: bool,
        now: DateTime<Utc>,
    ) -> Result<(), WicketError>;
}
