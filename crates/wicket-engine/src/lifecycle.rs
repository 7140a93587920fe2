// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation status transitions and operator actions.
//!
//! All status writes go through [`ConversationLifecycle`] so the transition
//! table and the flag invariant (`handoff_confirmation_pending` only while
//! `pending`) hold everywhere. Durable writes are partial-field updates;
//! same-field races resolve last-write-wins on server timestamps.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use wicket_config::model::WidgetConfig;
use wicket_core::types::{
    ChatMessage, Conversation, ConversationStatus, ConversationUpdate, MessageRole,
    UnreadCounter,
};
use wicket_core::{ConversationEvent, ConversationStore, EventBus, WicketError};

/// Whether a status transition is in the allowed table.
///
/// Self-transitions are not transitions; the confirmed-handoff step keeps
/// `pending` and only clears the flag.
pub fn can_transition(from: ConversationStatus, to: ConversationStatus) -> bool {
    use ConversationStatus::*;
    match (from, to) {
        // Handoff offer, and the visitor declining it.
        (Ai, Pending) | (Pending, Ai) => true,
        // Operator joining.
        (Ai, Active) | (Pending, Active) | (Inactive, Active) => true,
        // Operator leaving, or new activity reviving an idle conversation.
        (Active, Ai) | (Inactive, Ai) => true,
        // Sweep-driven idling.
        (Ai, Inactive) | (Active, Inactive) => true,
        // Any non-terminal conversation can end.
        (from, Ended) => !from.is_terminal(),
        // Administrative archiving hides anything, even ended conversations.
        (from, Archived) => from != Archived,
        _ => false,
    }
}

/// Owns status mutations and the system messages that accompany them.
pub struct ConversationLifecycle {
    store: Arc<dyn ConversationStore>,
    events: EventBus,
    texts: WidgetConfig,
}

impl ConversationLifecycle {
    pub fn new(store: Arc<dyn ConversationStore>, events: EventBus, texts: WidgetConfig) -> Self {
        Self {
            store,
            events,
            texts,
        }
    }

    pub fn texts(&self) -> &WidgetConfig {
        &self.texts
    }

    /// Validate and apply a status transition, publishing the change.
    ///
    /// `extra` carries any fields that must land in the same write as the
    /// status (operator assignment, flag clearing).
    pub async fn transition(
        &self,
        conversation: &Conversation,
        to: ConversationStatus,
        extra: ConversationUpdate,
    ) -> Result<(), WicketError> {
        let from = conversation.status;
        if !can_transition(from, to) {
            return Err(WicketError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let update = ConversationUpdate {
            status: Some(to),
            ..extra
        };
        self.store.apply_update(&conversation.id, update).await?;
        debug!(conversation_id = %conversation.id, %from, %to, "status transition");
        self.events.publish(ConversationEvent::StatusChanged {
            conversation_id: conversation.id.clone(),
            from,
            to,
        });
        Ok(())
    }

    /// Append a message and refresh the last-message cache in one pass.
    ///
    /// Visitor messages also bump the operator-facing unread counter;
    /// operator messages reset it.
    pub async fn record_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage, WicketError> {
        let now = Utc::now();
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: now,
        };
        self.store.append_message(&message).await?;

        let unread = match role {
            MessageRole::User => Some(UnreadCounter::Increment),
            MessageRole::Operator => Some(UnreadCounter::Reset),
            MessageRole::Ai | MessageRole::System => None,
        };
        self.store
            .apply_update(
                conversation_id,
                ConversationUpdate {
                    last_message: Some((content.to_string(), now)),
                    unread,
                    ..ConversationUpdate::default()
                },
            )
            .await?;

        self.events.publish(ConversationEvent::MessageAppended {
            conversation_id: conversation_id.to_string(),
            role,
        });
        Ok(message)
    }

    /// An operator explicitly takes over the conversation.
    ///
    /// Clears any pending handoff confirmation in the same write and
    /// announces the join with a system message.
    pub async fn operator_join(
        &self,
        conversation_id: &str,
        operator_id: &str,
    ) -> Result<(), WicketError> {
        let conversation = self.require(conversation_id).await?;
        self.transition(
            &conversation,
            ConversationStatus::Active,
            ConversationUpdate {
                operator_id: Some(Some(operator_id.to_string())),
                handoff_confirmation_pending: Some(false),
                ..ConversationUpdate::default()
            },
        )
        .await?;
        self.record_message(
            conversation_id,
            MessageRole::System,
            &self.texts.operator_joined_message,
        )
        .await?;
        info!(conversation_id, operator_id, "operator joined");
        Ok(())
    }

    /// An operator explicitly leaves; the assistant resumes control.
    pub async fn operator_leave(&self, conversation_id: &str) -> Result<(), WicketError> {
        let conversation = self.require(conversation_id).await?;
        self.transition(
            &conversation,
            ConversationStatus::Ai,
            ConversationUpdate {
                operator_id: Some(None),
                ..ConversationUpdate::default()
            },
        )
        .await?;
        self.record_message(
            conversation_id,
            MessageRole::System,
            &self.texts.ai_resumed_message,
        )
        .await?;
        info!(conversation_id, "operator left, assistant resumes");
        Ok(())
    }

    /// An operator sends a message.
    ///
    /// Resets the unread counter and bumps an `inactive` conversation back
    /// to `active`.
    pub async fn operator_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ChatMessage, WicketError> {
        let conversation = self.require(conversation_id).await?;
        if conversation.status.is_terminal() {
            return Err(WicketError::InvalidTransition {
                from: conversation.status.to_string(),
                to: ConversationStatus::Active.to_string(),
            });
        }
        if conversation.status == ConversationStatus::Inactive {
            self.transition(
                &conversation,
                ConversationStatus::Active,
                ConversationUpdate::default(),
            )
            .await?;
        }
        self.record_message(conversation_id, MessageRole::Operator, content)
            .await
    }

    /// Explicitly close a conversation.
    ///
    /// Idempotent: delegates to the store's batched close, which skips
    /// conversations already carrying the canonical ended text. Returns
    /// whether this call actually closed it.
    pub async fn close(&self, conversation_id: &str) -> Result<bool, WicketError> {
        let conversation = self.require(conversation_id).await?;
        let closed = self
            .store
            .close_batch(
                std::slice::from_ref(&conversation.id),
                &self.texts.ended_message,
                Utc::now(),
            )
            .await?;
        if closed > 0 {
            self.events.publish(ConversationEvent::StatusChanged {
                conversation_id: conversation.id.clone(),
                from: conversation.status,
                to: ConversationStatus::Ended,
            });
            self.events.publish(ConversationEvent::MessageAppended {
                conversation_id: conversation.id,
                role: MessageRole::System,
            });
        }
        Ok(closed > 0)
    }

    /// Administrative archive. External trigger; no system message.
    pub async fn archive(&self, conversation_id: &str) -> Result<(), WicketError> {
        let conversation = self.require(conversation_id).await?;
        self.transition(
            &conversation,
            ConversationStatus::Archived,
            ConversationUpdate::default(),
        )
        .await
    }

    /// Where an `inactive` conversation should land when the visitor sends
    /// again: back to the operator if one still owns it, else the assistant.
    pub fn reactivation_target(conversation: &Conversation) -> Option<ConversationStatus> {
        if conversation.status != ConversationStatus::Inactive {
            return None;
        }
        if conversation.operator_id.is_some() {
            Some(ConversationStatus::Active)
        } else {
            Some(ConversationStatus::Ai)
        }
    }

    pub(crate) async fn require(&self, id: &str) -> Result<Conversation, WicketError> {
        self.store
            .get_conversation(id)
            .await?
            .ok_or_else(|| WicketError::NotFound {
                entity: "conversation",
                id: id.to_string(),
            })
    }
}
