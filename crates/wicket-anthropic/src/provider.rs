// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant adapter backed by the Anthropic Messages API.
//!
//! Three concerns share one client: visitor-facing replies, the
//! temperature-zero handoff intent classification, and lazy title
//! generation. Classification is infallible by contract -- every failure
//! path lands on OTHER.

use std::str::FromStr;

use async_trait::async_trait;
use tracing::warn;
use wicket_config::model::{AnthropicConfig, AssistantConfig};
use wicket_core::types::{
    AdapterType, AssistantReply, AssistantTurn, HandoffIntent, HealthStatus, MessageRole,
};
use wicket_core::{Adapter, AssistantAdapter, WicketError};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify a visitor's reply to the question of whether they want to be \
connected to a human support agent. Reply with exactly one word:\n\
POSITIVE - the visitor agrees or asks for a human\n\
NEGATIVE - the visitor declines\n\
OTHER - anything else (a new question, small talk, unclear)\n\
No punctuation, no explanation.";

const TITLE_SYSTEM_PROMPT: &str = "\
Write a short descriptive title (at most six words) for this support \
conversation, in the language the visitor writes in. Reply with the title \
only.";

/// Anthropic-backed assistant provider.
pub struct AnthropicAssistant {
    client: AnthropicClient,
    config: AssistantConfig,
    system_prompt: String,
}

impl AnthropicAssistant {
    /// Build the provider from configuration.
    ///
    /// The API key comes from `[anthropic] api_key` or the
    /// `ANTHROPIC_API_KEY` environment variable.
    pub fn new(
        anthropic: &AnthropicConfig,
        assistant: &AssistantConfig,
        handoff_offer: &str,
    ) -> Result<Self, WicketError> {
        let api_key = anthropic
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                WicketError::Config(
                    "no Anthropic API key: set [anthropic] api_key or ANTHROPIC_API_KEY".into(),
                )
            })?;
        let client = AnthropicClient::new(&api_key, &anthropic.api_version)?;
        Ok(Self::from_client(client, assistant, handoff_offer))
    }

    fn from_client(
        client: AnthropicClient,
        assistant: &AssistantConfig,
        handoff_offer: &str,
    ) -> Self {
        let system_prompt = format!(
            "You are a customer-support assistant embedded in a shop's chat \
             widget. Answer concisely and helpfully in the visitor's \
             language. If the visitor asks for a human, or you cannot help, \
             reply with exactly this sentence and nothing else:\n{handoff_offer}"
        );
        Self {
            client,
            config: assistant.clone(),
            system_prompt,
        }
    }

    #[cfg(test)]
    fn for_tests(base_url: &str, assistant: &AssistantConfig) -> Self {
        let client = AnthropicClient::new("test-key", "2023-06-01")
            .unwrap()
            .with_base_url(base_url.to_string());
        Self::from_client(client, assistant, "Would you like a human agent?")
    }

    fn to_api_messages(history: &[AssistantTurn], incoming: &str) -> Vec<ApiMessage> {
        let mut messages: Vec<ApiMessage> = history
            .iter()
            .map(|turn| ApiMessage {
                role: match turn.role {
                    MessageRole::Ai => "assistant".to_string(),
                    _ => "user".to_string(),
                },
                content: turn.content.clone(),
            })
            .collect();
        messages.push(ApiMessage {
            role: "user".to_string(),
            content: incoming.to_string(),
        });
        messages
    }
}

#[async_trait]
impl Adapter for AnthropicAssistant {
    fn name(&self) -> &str {
        "anthropic"
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
impl AssistantAdapter for AnthropicAssistant {
    async fn reply(
        &self,
        history: &[AssistantTurn],
        incoming: &str,
    ) -> Result<AssistantReply, WicketError> {
        let request = MessageRequest {
            model: self.config.model.clone(),
            messages: Self::to_api_messages(history, incoming),
            system: Some(self.system_prompt.clone()),
            max_tokens: self.config.max_tokens,
            temperature: None,
        };
        let response = self.client.complete_message(&request).await?;
        Ok(AssistantReply {
            text: response.text().trim().to_string(),
            confidence: None,
        })
    }

    async fn classify_intent(&self, text: &str) -> HandoffIntent {
        let request = MessageRequest {
            model: self.config.classifier_model.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: text.to_string(),
            }],
            system: Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
            max_tokens: 8,
            temperature: Some(0.0),
        };
        let label = match self.client.complete_message(&request).await {
            Ok(response) => response.text(),
            Err(e) => {
                warn!(error = %e, "intent classification call failed, defaulting to OTHER");
                return HandoffIntent::Other;
            }
        };
        let label = label.trim().to_ascii_uppercase();
        let label = label.split_whitespace().next().unwrap_or("");
        HandoffIntent::from_str(label).unwrap_or_else(|_| {
            warn!(label, "unparseable classifier output, defaulting to OTHER");
            HandoffIntent::Other
        })
    }

    async fn generate_title(&self, turns: &[AssistantTurn]) -> Result<String, WicketError> {
        let transcript = turns
            .iter()
            .map(|turn| format!("[{}] {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");
        let request = MessageRequest {
            model: self.config.title_model.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: transcript,
            }],
            system: Some(TITLE_SYSTEM_PROMPT.to_string()),
            max_tokens: 32,
            temperature: None,
        };
        let response = self.client.complete_message(&request).await?;
        let title = response.text().lines().next().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return Err(WicketError::Provider {
                message: "title generation returned empty text".into(),
                source: None,
            });
        }
        Ok(title)
    }
}
