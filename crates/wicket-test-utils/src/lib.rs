// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters and fixtures for testing the Wicket workspace.
//!
//! These mocks implement the `wicket-core` seam traits with deterministic,
//! in-process behavior so engine and gateway tests run without a database
//! file, network, or LLM access.

pub mod memory_store;
pub mod mock_assistant;
pub mod mock_identity;

pub use memory_store::MemoryStore;
pub use mock_assistant::MockAssistant;
pub use mock_identity::MockIdentityIssuer;
