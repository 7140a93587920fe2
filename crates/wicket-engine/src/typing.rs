// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral typing presence with staleness checking.
//!
//! Presence is advisory only: a `last_update` older than the TTL reads as
//! "not typing" regardless of the stored flags, and typing state never
//! drives a status transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use wicket_core::types::{TypingParty, TypingState};
use wicket_core::{ConversationStore, WicketError};

/// Default staleness TTL for typing signals.
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(5);

/// Whether a typing record is still fresh at `now`.
pub fn is_fresh(typing: &TypingState, now: DateTime<Utc>, ttl: Duration) -> bool {
    match typing.last_update {
        Some(last_update) => {
            let age = now - last_update;
            age >= chrono::Duration::zero()
                && age <= chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero())
        }
        None => false,
    }
}

/// The effective typing flags after the staleness check.
pub fn effective(typing: &TypingState, now: DateTime<Utc>, ttl: Duration) -> TypingState {
    if is_fresh(typing, now, ttl) {
        typing.clone()
    } else {
        TypingState::default()
    }
}

/// Records typing signals and answers staleness-checked presence reads.
pub struct TypingPresenceTracker {
    store: Arc<dyn ConversationStore>,
    ttl: Duration,
}

impl TypingPresenceTracker {
    pub fn new(store: Arc<dyn ConversationStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Record a typing signal with a server-assigned timestamp.
    pub async fn set_typing(
        &self,
        conversation_id: &str,
        party: TypingParty,
        is_typing: bool,
    ) -> Result<(), WicketError> {
        self.store
            .set_typing(conversation_id, party, is_typing, Utc::now())
            .await
    }

    /// Staleness-checked presence for a conversation.
    pub async fn presence(&self, conversation_id: &str) -> Result<TypingState, WicketError> {
        let conversation = self
            .store
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| WicketError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        Ok(effective(&conversation.typing, Utc::now(), self.ttl))
    }
}
