// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wicket support-chat platform.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Wicket workspace. The conversation
//! engine depends only on the seams defined here; concrete adapters live in
//! their own crates.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WicketError;
pub use events::{ConversationEvent, EventBus, EventSubscription};
pub use types::{
    AdapterType, ChatMessage, Conversation, ConversationStatus, ConversationUpdate,
    HandoffIntent, HealthStatus, MessageRole, TypingParty,
};

pub use traits::{Adapter, AssistantAdapter, ConversationStore, IdentityIssuer};
