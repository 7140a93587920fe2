// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff negotiation: the "ask the visitor to confirm" sub-protocol.
//!
//! On each incoming visitor message, either resolve a pending handoff
//! confirmation via the intent classifier, or forward the message to the
//! assistant and watch its reply for the verbatim canonical handoff offer.
//! Classifier calls run under a short timeout and default to OTHER; title
//! generation is lazy and its failures never block the reply path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use wicket_config::model::AssistantConfig;
use wicket_core::types::{AssistantTurn, ChatMessage, ConversationUpdate};
use wicket_core::{
    AssistantAdapter, ConversationStatus, ConversationStore, HandoffIntent, MessageRole,
    WicketError,
};

use crate::lifecycle::ConversationLifecycle;

/// How many recent messages feed the assistant as context.
const REPLY_CONTEXT_TURNS: i64 = 20;

/// Outcome of negotiating one incoming visitor message.
#[derive(Debug, Clone)]
pub struct NegotiatedReply {
    /// The text to show the visitor. `None` while an operator owns the
    /// conversation -- the assistant stays silent.
    pub reply: Option<String>,
    /// Confidence of the assistant turn, when one was produced.
    pub confidence: Option<f64>,
    /// Conversation status after all side effects.
    pub status: ConversationStatus,
}

/// Negotiates handoff confirmations and drives the assistant reply loop.
pub struct HandoffNegotiator {
    store: Arc<dyn ConversationStore>,
    assistant: Arc<dyn AssistantAdapter>,
    lifecycle: Arc<ConversationLifecycle>,
    classifier_timeout: Duration,
    title_context_turns: usize,
}

impl HandoffNegotiator {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        assistant: Arc<dyn AssistantAdapter>,
        lifecycle: Arc<ConversationLifecycle>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            store,
            assistant,
            lifecycle,
            classifier_timeout: Duration::from_secs(config.classifier_timeout_secs),
            title_context_turns: config.title_context_turns,
        }
    }

    /// Handle one incoming visitor message end to end.
    pub async fn respond(
        &self,
        conversation_id: &str,
        incoming: &str,
    ) -> Result<NegotiatedReply, WicketError> {
        let mut conversation = self.lifecycle.require(conversation_id).await?;
        if conversation.status.is_terminal() {
            return Err(WicketError::InvalidTransition {
                from: conversation.status.to_string(),
                to: ConversationStatus::Ai.to_string(),
            });
        }

        // Persist the visitor message before anything can fail downstream.
        self.lifecycle
            .record_message(conversation_id, MessageRole::User, incoming)
            .await?;

        // New activity revives an idle conversation before routing.
        if let Some(target) = ConversationLifecycle::reactivation_target(&conversation) {
            self.lifecycle
                .transition(&conversation, target, ConversationUpdate::default())
                .await?;
            conversation.status = target;
        }

        // Operator in control: the assistant stays out of the loop.
        if conversation.status == ConversationStatus::Active {
            return Ok(NegotiatedReply {
                reply: None,
                confidence: None,
                status: ConversationStatus::Active,
            });
        }

        // Pending confirmation: classify the visitor's yes/no.
        if conversation.handoff_confirmation_pending {
            let intent = self.classify(incoming).await;
            debug!(conversation_id, %intent, "handoff confirmation classified");
            match intent {
                HandoffIntent::Positive => {
                    // Confirmed: clear the flag, keep status pending -- now
                    // genuinely waiting for an operator.
                    self.store
                        .apply_update(
                            conversation_id,
                            ConversationUpdate {
                                handoff_confirmation_pending: Some(false),
                                ..ConversationUpdate::default()
                            },
                        )
                        .await?;
                    let connecting = self.lifecycle.texts().connecting_message.clone();
                    self.lifecycle
                        .record_message(conversation_id, MessageRole::Ai, &connecting)
                        .await?;
                    return Ok(NegotiatedReply {
                        reply: Some(connecting),
                        confidence: None,
                        status: ConversationStatus::Pending,
                    });
                }
                HandoffIntent::Negative | HandoffIntent::Other => {
                    // Offer discarded; the assistant resumes and answers
                    // this same message.
                    self.lifecycle
                        .transition(
                            &conversation,
                            ConversationStatus::Ai,
                            ConversationUpdate {
                                handoff_confirmation_pending: Some(false),
                                ..ConversationUpdate::default()
                            },
                        )
                        .await?;
                    conversation.status = ConversationStatus::Ai;
                }
            }
        }

        // Assistant flow.
        let history = self.history(conversation_id, incoming).await?;
        let assistant_reply = self.assistant.reply(&history, incoming).await?;

        self.lifecycle
            .record_message(conversation_id, MessageRole::Ai, &assistant_reply.text)
            .await?;
        if assistant_reply.confidence.is_some() {
            self.store
                .apply_update(
                    conversation_id,
                    ConversationUpdate {
                        confidence_score: assistant_reply.confidence,
                        ..ConversationUpdate::default()
                    },
                )
                .await?;
        }

        // The verbatim canonical offer turns into a pending handoff.
        let mut status = conversation.status;
        if conversation.status == ConversationStatus::Ai
            && assistant_reply.text == self.lifecycle.texts().handoff_offer
        {
            self.lifecycle
                .transition(
                    &conversation,
                    ConversationStatus::Pending,
                    ConversationUpdate {
                        handoff_confirmation_pending: Some(true),
                        ..ConversationUpdate::default()
                    },
                )
                .await?;
            status = ConversationStatus::Pending;
        }

        if conversation.title.is_none() {
            self.maybe_generate_title(conversation_id).await;
        }

        Ok(NegotiatedReply {
            reply: Some(assistant_reply.text),
            confidence: assistant_reply.confidence,
            status,
        })
    }

    /// Classify under the configured timeout; expiry reads as OTHER so the
    /// conversation is never blocked on the classifier.
    async fn classify(&self, text: &str) -> HandoffIntent {
        match tokio::time::timeout(self.classifier_timeout, self.assistant.classify_intent(text))
            .await
        {
            Ok(intent) => intent,
            Err(_) => {
                warn!(
                    timeout_secs = self.classifier_timeout.as_secs(),
                    "intent classification timed out, defaulting to OTHER"
                );
                HandoffIntent::Other
            }
        }
    }

    /// Recent conversation context, excluding the just-persisted incoming
    /// message (it is passed to the assistant separately).
    async fn history(
        &self,
        conversation_id: &str,
        incoming: &str,
    ) -> Result<Vec<AssistantTurn>, WicketError> {
        let mut messages = self
            .store
            .messages(conversation_id, Some(REPLY_CONTEXT_TURNS))
            .await?;
        if messages
            .last()
            .is_some_and(|m| m.role == MessageRole::User && m.content == incoming)
        {
            messages.pop();
        }
        Ok(messages.iter().map(to_turn).collect())
    }

    /// Lazily generate a title from the last few turns. Failures are logged
    /// and swallowed; a later reply will retry.
    async fn maybe_generate_title(&self, conversation_id: &str) {
        let turns = match self
            .store
            .messages(conversation_id, Some(self.title_context_turns as i64))
            .await
        {
            Ok(messages) => messages.iter().map(to_turn).collect::<Vec<_>>(),
            Err(e) => {
                warn!(conversation_id, error = %e, "title context fetch failed");
                return;
            }
        };
        match self.assistant.generate_title(&turns).await {
            Ok(title) => {
                let update = ConversationUpdate {
                    title: Some(title),
                    ..ConversationUpdate::default()
                };
                if let Err(e) = self.store.apply_update(conversation_id, update).await {
                    warn!(conversation_id, error = %e, "title write failed");
                }
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "title generation failed (non-fatal)");
            }
        }
    }
}

fn to_turn(message: &ChatMessage) -> AssistantTurn {
    AssistantTurn {
        role: message.role,
        content: message.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wicket_config::model::WidgetConfig;
    use wicket_core::types::{ClientParams, Conversation};
    use wicket_core::EventBus;
    use wicket_test_utils::{MemoryStore, MockAssistant};

    struct Fixture {
        store: Arc<MemoryStore>,
        assistant: Arc<MockAssistant>,
        negotiator: HandoffNegotiator,
        texts: WidgetConfig,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let assistant = Arc::new(MockAssistant::new());
        let texts = WidgetConfig::default();
        let lifecycle = Arc::new(ConversationLifecycle::new(
            store.clone(),
            EventBus::new(),
            texts.clone(),
        ));
        let negotiator = HandoffNegotiator::new(
            store.clone(),
            assistant.clone(),
            lifecycle,
            &AssistantConfig::default(),
        );
        Fixture {
            store,
            assistant,
            negotiator,
            texts,
        }
    }

    async fn seed(
        fixture: &Fixture,
        id: &str,
        status: ConversationStatus,
        flag: bool,
    ) {
        let mut conv = Conversation::new(
            id.to_string(),
            format!("chat-{id}"),
            "v-1".to_string(),
            ClientParams::default(),
            Utc::now(),
        );
        conv.status = status;
        conv.handoff_confirmation_pending = flag;
        fixture.store.insert_raw(conv).await;
    }

    #[tokio::test]
    async fn assistant_reply_flows_through() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ai, false).await;
        f.assistant.add_reply("We ship worldwide!", Some(0.92)).await;

        let outcome = f
            .negotiator
            .respond("c-1", "do you ship to Albania?")
            .await
            .unwrap();

        assert_eq!(outcome.reply.as_deref(), Some("We ship worldwide!"));
        assert_eq!(outcome.confidence, Some(0.92));
        assert_eq!(outcome.status, ConversationStatus::Ai);

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.confidence_score, Some(0.92));
        assert_eq!(conv.last_message.as_deref(), Some("We ship worldwide!"));

        let messages = f.store.messages("c-1", None).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Ai);
    }

    #[tokio::test]
    async fn verbatim_offer_sets_pending_with_flag() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ai, false).await;
        let offer = f.texts.handoff_offer.clone();
        f.assistant.add_reply(&offer, Some(0.31)).await;

        let outcome = f.negotiator.respond("c-1", "i need a human").await.unwrap();

        assert_eq!(outcome.status, ConversationStatus::Pending);
        assert_eq!(outcome.reply.as_deref(), Some(offer.as_str()));

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Pending);
        assert!(conv.handoff_confirmation_pending);
    }

    #[tokio::test]
    async fn near_miss_reply_does_not_trigger_handoff() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ai, false).await;
        f.assistant
            .add_reply("Would you like me to connect you with a human agent?!", None)
            .await;

        let outcome = f.negotiator.respond("c-1", "help").await.unwrap();
        assert_eq!(outcome.status, ConversationStatus::Ai);
        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert!(!conv.handoff_confirmation_pending);
    }

    #[tokio::test]
    async fn positive_confirmation_keeps_pending_and_clears_flag() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Pending, true).await;
        f.assistant.add_intent(HandoffIntent::Positive).await;

        let outcome = f.negotiator.respond("c-1", "po").await.unwrap();

        assert_eq!(outcome.status, ConversationStatus::Pending);
        assert_eq!(outcome.reply.as_deref(), Some(f.texts.connecting_message.as_str()));

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Pending);
        assert!(!conv.handoff_confirmation_pending);
        assert_eq!(f.assistant.classified_texts().await, vec!["po".to_string()]);
    }

    #[tokio::test]
    async fn other_reply_reverts_to_assistant() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Pending, true).await;
        // Intent queue empty: classification falls back to OTHER.
        f.assistant.add_reply("Çmimi është 20 euro.", None).await;

        let outcome = f.negotiator.respond("c-1", "sa kushton?").await.unwrap();

        assert_eq!(outcome.status, ConversationStatus::Ai);
        assert_eq!(outcome.reply.as_deref(), Some("Çmimi është 20 euro."));

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Ai);
        assert!(!conv.handoff_confirmation_pending);
    }

    #[tokio::test]
    async fn negative_confirmation_reverts_to_assistant() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Pending, true).await;
        f.assistant.add_intent(HandoffIntent::Negative).await;
        f.assistant.add_reply("No problem, how else can I help?", None).await;

        let outcome = f.negotiator.respond("c-1", "jo, faleminderit").await.unwrap();
        assert_eq!(outcome.status, ConversationStatus::Ai);
        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert!(!conv.handoff_confirmation_pending);
    }

    #[tokio::test]
    async fn operator_active_conversation_gets_no_assistant_reply() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Active, false).await;

        let outcome = f.negotiator.respond("c-1", "hello operator").await.unwrap();
        assert!(outcome.reply.is_none());
        assert_eq!(outcome.status, ConversationStatus::Active);

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        // The message was still persisted and counted.
        assert_eq!(conv.unread_count, 1);
        assert_eq!(conv.last_message.as_deref(), Some("hello operator"));
    }

    #[tokio::test]
    async fn inactive_without_operator_reverts_to_assistant() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Inactive, false).await;
        f.assistant.add_reply("Welcome back!", None).await;

        let outcome = f.negotiator.respond("c-1", "are you still there?").await.unwrap();
        assert_eq!(outcome.status, ConversationStatus::Ai);
        assert_eq!(outcome.reply.as_deref(), Some("Welcome back!"));
    }

    #[tokio::test]
    async fn inactive_with_operator_reverts_to_active() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Inactive, false).await;
        f.store
            .apply_update(
                "c-1",
                ConversationUpdate {
                    operator_id: Some(Some("op-1".into())),
                    ..ConversationUpdate::default()
                },
            )
            .await
            .unwrap();

        let outcome = f.negotiator.respond("c-1", "hello again").await.unwrap();
        assert!(outcome.reply.is_none());
        assert_eq!(outcome.status, ConversationStatus::Active);
        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Active);
    }

    #[tokio::test]
    async fn title_generated_lazily_once() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ai, false).await;
        f.assistant.add_reply("Sure, sizes run S-XL.", None).await;
        f.assistant.add_title("Sizing question").await;

        f.negotiator.respond("c-1", "what sizes do you have?").await.unwrap();

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert_eq!(conv.title.as_deref(), Some("Sizing question"));
    }

    #[tokio::test]
    async fn title_failure_never_blocks_the_reply() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ai, false).await;
        f.assistant.add_reply("Here to help.", None).await;
        f.assistant.set_fail_titles(true).await;

        let outcome = f.negotiator.respond("c-1", "hi").await.unwrap();
        assert_eq!(outcome.reply.as_deref(), Some("Here to help."));

        let conv = f.store.get_conversation("c-1").await.unwrap().unwrap();
        assert!(conv.title.is_none());
    }

    #[tokio::test]
    async fn terminal_conversation_rejects_messages() {
        let f = fixture();
        seed(&f, "c-1", ConversationStatus::Ended, false).await;
        let err = f.negotiator.respond("c-1", "hello?").await.unwrap_err();
        assert!(matches!(err, WicketError::InvalidTransition { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn classifier_timeout_defaults_to_other() {
        use async_trait::async_trait;
        use wicket_core::types::{AdapterType, AssistantReply, HealthStatus};
        use wicket_core::Adapter;

        /// Classifier that never answers; replies are instant.
        struct StalledClassifier;

        #[async_trait]
        impl Adapter for StalledClassifier {
            fn name(&self) -> &str {
                "stalled"
            }
            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }
            fn adapter_type(&self) -> AdapterType {
                AdapterType::Assistant
            }
            async fn health_check(&self) -> Result<HealthStatus, WicketError> {
                Ok(HealthStatus::Healthy)
            }
            async fn shutdown(&self) -> Result<(), WicketError> {
                Ok(())
            }
        }

        #[async_trait]
        impl AssistantAdapter for StalledClassifier {
            async fn reply(
                &self,
                _history: &[AssistantTurn],
                _incoming: &str,
            ) -> Result<AssistantReply, WicketError> {
                Ok(AssistantReply {
                    text: "resumed".into(),
                    confidence: None,
                })
            }
            async fn classify_intent(&self, _text: &str) -> HandoffIntent {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                HandoffIntent::Positive
            }
            async fn generate_title(
                &self,
                _turns: &[AssistantTurn],
            ) -> Result<String, WicketError> {
                Ok("t".into())
            }
        }

        let store = Arc::new(MemoryStore::new());
        let texts = WidgetConfig::default();
        let lifecycle = Arc::new(ConversationLifecycle::new(
            store.clone(),
            EventBus::new(),
            texts.clone(),
        ));
        let negotiator = HandoffNegotiator::new(
            store.clone(),
            Arc::new(StalledClassifier),
            lifecycle,
            &AssistantConfig::default(),
        );

        let mut conv = Conversation::new(
            "c-1".into(),
            "chat-1".into(),
            "v-1".into(),
            ClientParams::default(),
            Utc::now(),
        );
        conv.status = ConversationStatus::Pending;
        conv.handoff_confirmation_pending = true;
        store.insert_raw(conv).await;

        // Timeout elapses (auto-advanced), classification reads as OTHER,
        // and the assistant resumes instead of confirming the handoff.
        let outcome = negotiator.respond("c-1", "po").await.unwrap();
        assert_eq!(outcome.status, ConversationStatus::Ai);
        assert_eq!(outcome.reply.as_deref(), Some("resumed"));
    }
}
