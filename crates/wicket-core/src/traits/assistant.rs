// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant provider trait for LLM-backed completion and classification.

use async_trait::async_trait;

use crate::error::WicketError;
use crate::traits::adapter::Adapter;
use crate::types::{AssistantReply, AssistantTurn, HandoffIntent};

/// Seam to the language-model service.
///
/// The engine treats it as a black box: text in, text or label out.
#[async_trait]
pub trait AssistantAdapter: Adapter {
    /// Produce the assistant's reply to an incoming visitor message, given
    /// recent conversation context.
    async fn reply(
        &self,
        history: &[AssistantTurn],
        incoming: &str,
    ) -> Result<AssistantReply, WicketError>;

    /// Classify a visitor reply to a handoff offer.
    ///
    /// Single-label multi-class decision at temperature zero. Infallible by
    /// contract: any provider failure or unparseable output maps to
    /// [`HandoffIntent::Other`] so the conversation is never blocked.
    async fn classify_intent(&self, text: &str) -> HandoffIntent;

    /// Generate a short descriptive title from recent turns.
    ///
    /// May fail; callers swallow the error and retry on a later reply.
    async fn generate_title(&self, turns: &[AssistantTurn]) -> Result<String, WicketError>;
}
