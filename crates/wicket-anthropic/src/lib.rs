// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API provider for the Wicket assistant seam.
//!
//! [`AnthropicAssistant`] implements `wicket-core`'s `AssistantAdapter`:
//! visitor replies on the configured model, temperature-zero single-label
//! handoff intent classification (defaulting to OTHER on any failure), and
//! short title generation.

pub mod client;
pub mod provider;
pub mod types;

pub use client::AnthropicClient;
pub use provider::AnthropicAssistant;
