// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration engine for the Wicket support-chat platform.
//!
//! Hosts the components with real state and failure-handling concerns:
//! session bootstrap with domain-trust verification, the conversation
//! status machine, handoff negotiation against the intent classifier, the
//! idle sweeper, and typing presence. Every component takes its
//! collaborators as explicit constructor parameters so tests substitute
//! fakes freely.

pub mod allowlist;
pub mod bootstrap;
pub mod handoff;
pub mod lifecycle;
pub mod sweeper;
pub mod typing;

pub use allowlist::DomainAllowlist;
pub use bootstrap::{BootstrapOutcome, BootstrapRequest, SessionBootstrapper};
pub use handoff::{HandoffNegotiator, NegotiatedReply};
pub use lifecycle::{can_transition, ConversationLifecycle};
pub use sweeper::{IdleSweeper, SweepAction, SweepReport};
pub use typing::TypingPresenceTracker;
