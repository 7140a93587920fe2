// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wicket support-chat platform.

use thiserror::Error;

/// The primary error type used across all Wicket adapter traits and core operations.
///
/// Expected conditions (a conversation that does not exist, an origin outside
/// the allowlist, an illegal status transition) get their own tagged variants
/// so callers can distinguish them from genuine faults.
#[derive(Debug, Error)]
pub enum WicketError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requesting origin is not covered by the widget domain allowlist.
    #[error("origin not allowed: {origin}")]
    DomainRejected { origin: String },

    /// An entity lookup came back empty where the caller required a hit.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conversation status transition outside the allowed table.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Assistant provider errors (API failure, token limits, unparseable output).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Identity issuance errors (issuer unreachable, token minting failure).
    #[error("identity error: {message}")]
    Identity {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WicketError {
    /// Wrap an arbitrary error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WicketError::Storage {
            source: Box::new(source),
        }
    }

    /// Wrap an arbitrary error as a provider error with context.
    pub fn provider<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WicketError::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap an arbitrary error as an identity error with context.
    pub fn identity<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        WicketError::Identity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for the variants that represent an expected, user-surfaceable
    /// rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WicketError::DomainRejected { .. }
                | WicketError::NotFound { .. }
                | WicketError::InvalidTransition { .. }
        )
    }
}
