// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock assistant adapter for deterministic testing.
//!
//! `MockAssistant` implements `AssistantAdapter` with pre-configured
//! responses, enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wicket_core::types::{
    AdapterType, AssistantReply, AssistantTurn, HandoffIntent, HealthStatus,
};
use wicket_core::{Adapter, AssistantAdapter, WicketError};

/// A mock assistant that returns pre-configured replies and intent labels.
///
/// Replies and intents are popped from FIFO queues. When the reply queue is
/// empty, a default "mock reply" text is returned; when the intent queue is
/// empty, classification returns [`HandoffIntent::Other`] -- the same
/// fallback the real classifier uses on failure.
pub struct MockAssistant {
    replies: Arc<Mutex<VecDeque<AssistantReply>>>,
    intents: Arc<Mutex<VecDeque<HandoffIntent>>>,
    titles: Arc<Mutex<VecDeque<String>>>,
    /// When true, `generate_title` fails. Replies are unaffected.
    fail_titles: Arc<Mutex<bool>>,
    /// Incoming texts passed to `classify_intent`, for assertions.
    classified: Arc<Mutex<Vec<String>>>,
}

impl MockAssistant {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            intents: Arc::new(Mutex::new(VecDeque::new())),
            titles: Arc::new(Mutex::new(VecDeque::new())),
            fail_titles: Arc::new(Mutex::new(false)),
            classified: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-load plain text replies without confidence scores.
    pub fn with_replies(texts: Vec<&str>) -> Self {
        let assistant = Self::new();
        let replies = texts
            .into_iter()
            .map(|t| AssistantReply {
                text: t.to_string(),
                confidence: None,
            })
            .collect();
        *assistant.replies.try_lock().unwrap() = replies;
        assistant
    }

    pub async fn add_reply(&self, text: &str, confidence: Option<f64>) {
        self.replies.lock().await.push_back(AssistantReply {
            text: text.to_string(),
            confidence,
        });
    }

    pub async fn add_intent(&self, intent: HandoffIntent) {
        self.intents.lock().await.push_back(intent);
    }

    pub async fn add_title(&self, title: &str) {
        self.titles.lock().await.push_back(title.to_string());
    }

    pub async fn set_fail_titles(&self, fail: bool) {
        *self.fail_titles.lock().await = fail;
    }

    /// Texts that were passed to `classify_intent`, in call order.
    pub async fn classified_texts(&self) -> Vec<String> {
        self.classified.lock().await.clone()
    }
}

impl Default for MockAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockAssistant {
    fn name(&self) -> &str {
        "mock-assistant"
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
impl AssistantAdapter for MockAssistant {
    async fn reply(
        &self,
        _history: &[AssistantTurn],
        _incoming: &str,
    ) -> Result<AssistantReply, WicketError> {
        Ok(self.replies.lock().await.pop_front().unwrap_or(AssistantReply {
            text: "mock reply".to_string(),
            confidence: None,
        }))
    }

    async fn classify_intent(&self, text: &str) -> HandoffIntent {
        self.classified.lock().await.push(text.to_string());
        self.intents
            .lock()
            .await
            .pop_front()
            .unwrap_or(HandoffIntent::Other)
    }

    async fn generate_title(&self, _turns: &[AssistantTurn]) -> Result<String, WicketError> {
        if *self.fail_titles.lock().await {
            return Err(WicketError::Provider {
                message: "mock title failure".into(),
                source: None,
            });
        }
        Ok(self
            .titles
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "Mock conversation".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_replies_returned_in_order() {
        let assistant = MockAssistant::with_replies(vec!["first", "second"]);
        assert_eq!(assistant.reply(&[], "x").await.unwrap().text, "first");
        assert_eq!(assistant.reply(&[], "x").await.unwrap().text, "second");
        // Queue exhausted, falls back to default.
        assert_eq!(assistant.reply(&[], "x").await.unwrap().text, "mock reply");
    }

    #[tokio::test]
    async fn classify_defaults_to_other() {
        let assistant = MockAssistant::new();
        assert_eq!(assistant.classify_intent("po").await, HandoffIntent::Other);

        assistant.add_intent(HandoffIntent::Positive).await;
        assert_eq!(assistant.classify_intent("po").await, HandoffIntent::Positive);
        assert_eq!(
            assistant.classified_texts().await,
            vec!["po".to_string(), "po".to_string()]
        );
    }

    #[tokio::test]
    async fn title_failure_is_switchable() {
        let assistant = MockAssistant::new();
        assistant.add_title("Refund request").await;
        assert_eq!(assistant.generate_title(&[]).await.unwrap(), "Refund request");

        assistant.set_fail_titles(true).await;
        assert!(assistant.generate_title(&[]).await.is_err());
    }
}
