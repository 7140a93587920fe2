// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ConversationStore for engine tests.
//!
//! Mirrors the SQLite store's observable semantics (partial updates,
//! idempotent batch close, idle queries against server timestamps) without
//! touching disk. A switchable failure mode simulates storage faults.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use wicket_core::types::{
    AdapterType, ChatMessage, Conversation, ConversationStatus, ConversationUpdate,
    HealthStatus, MessageRole, TypingParty, UnreadCounter,
};
use wicket_core::{Adapter, ConversationStore, WicketError};

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    messages: Vec<ChatMessage>,
}

/// In-memory conversation store with SQLite-equivalent semantics.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            fail: AtomicBool::new(false),
        }
    }

    /// When enabled, every store operation fails with a storage error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> Result<(), WicketError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WicketError::Storage {
                source: "simulated storage failure".into(),
            });
        }
        Ok(())
    }

    /// Direct insert for test fixtures, bypassing validation.
    pub async fn insert_raw(&self, conversation: Conversation) {
        self.inner
            .lock()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation);
    }

    /// Number of messages stored across all conversations.
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.messages.len()
    }

    fn effective_ts(c: &Conversation) -> DateTime<Utc> {
        c.last_message_at.unwrap_or(c.created_at)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WicketError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WicketError> {
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), WicketError> {
        self.check_fail()?;
        let mut inner = self.inner.lock().await;
        if inner.conversations.contains_key(&conversation.id) {
            return Err(WicketError::Storage {
                source: format!("duplicate conversation id {}", conversation.id).into(),
            });
        }
        inner
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, WicketError> {
        self.check_fail()?;
        Ok(self.inner.lock().await.conversations.get(id).cloned())
    }

    async fn find_active_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Conversation>, WicketError> {
        self.check_fail()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .conversations
            .values()
            .filter(|c| c.external_id == external_id && !c.status.is_terminal())
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn apply_update(
        &self,
        id: &str,
        update: ConversationUpdate,
    ) -> Result<(), WicketError> {
        self.check_fail()?;
        if update.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().await;
        let conversation = inner
            .conversations
            .get_mut(id)
            .ok_or_else(|| WicketError::NotFound {
                entity: "conversation",
                id: id.to_string(),
            })?;

        if let Some(status) = update.status {
            conversation.status = status;
        }
        if let Some(flag) = update.handoff_confirmation_pending {
            conversation.handoff_confirmation_pending = flag;
        }
        if let Some(operator) = update.operator_id {
            conversation.operator_id = operator;
        }
        if let Some((text, at)) = update.last_message {
            conversation.last_message = Some(text);
            conversation.last_message_at = Some(at);
        }
        if let Some(title) = update.title {
            conversation.title = Some(title);
        }
        if let Some(score) = update.confidence_score {
            conversation.confidence_score = Some(score);
        }
        match update.unread {
            Some(UnreadCounter::Increment) => conversation.unread_count += 1,
            Some(UnreadCounter::Reset) => conversation.unread_count = 0,
            None => {}
        }
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), WicketError> {
        self.check_fail()?;
        self.inner.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatMessage>, WicketError> {
        self.check_fail()?;
        let inner = self.inner.lock().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        if let Some(limit) = limit {
            let keep = limit.max(0) as usize;
            if messages.len() > keep {
                messages = messages.split_off(messages.len() - keep);
            }
        }
        Ok(messages)
    }

    async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, WicketError> {
        self.check_fail()?;
        let inner = self.inner.lock().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        conversations.sort_by_key(|c| std::cmp::Reverse(Self::effective_ts(c)));
        Ok(conversations)
    }

    async fn list_idle_since(
        &self,
        statuses: &[ConversationStatus],
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, WicketError> {
        self.check_fail()?;
        let inner = self.inner.lock().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| statuses.contains(&c.status) && Self::effective_ts(c) < cutoff)
            .cloned()
            .collect();
        conversations.sort_by_key(Self::effective_ts);
        Ok(conversations)
    }

    async fn close_batch(
        &self,
        ids: &[String],
        ended_text: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, WicketError> {
        self.check_fail()?;
        let mut inner = self.inner.lock().await;
        let mut closed = 0usize;
        for id in ids {
            let Some(conversation) = inner.conversations.get_mut(id) else {
                continue;
            };
            if conversation.status.is_terminal() {
                continue;
            }
            if conversation.last_message.as_deref() == Some(ended_text) {
                continue;
            }
            conversation.status = ConversationStatus::Ended;
            conversation.last_message = Some(ended_text.to_string());
            conversation.last_message_at = Some(now);
            conversation.updated_at = now;
            inner.messages.push(ChatMessage {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: id.clone(),
                role: MessageRole::System,
                content: ended_text.to_string(),
                created_at: now,
            });
            closed += 1;
        }
        Ok(closed)
    }

    async fn set_typing(
        &self,
        conversation_id: &str,
        party: TypingParty,
        is_typing: bool,
        now: DateTime<Utc>,
    ) -> Result<(), WicketError> {
        self.check_fail()?;
        let mut inner = self.inner.lock().await;
        if let Some(conversation) = inner.conversations.get_mut(conversation_id) {
            match party {
                TypingParty::Visitor => conversation.typing.visitor = is_typing,
                TypingParty::Operator => conversation.typing.operator = is_typing,
            }
            conversation.typing.last_update = Some(now);
        }
        Ok(())
    }
}
