// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as threshold ordering and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::WicketConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WicketConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.gateway.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.sweep.inactive_after_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.inactive_after_secs must be positive".to_string(),
        });
    }

    if config.sweep.ended_after_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.ended_after_secs must be positive".to_string(),
        });
    }

    if config.sweep.inactive_after_secs >= config.sweep.ended_after_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "sweep.inactive_after_secs ({}) must be shorter than sweep.ended_after_secs ({})",
                config.sweep.inactive_after_secs, config.sweep.ended_after_secs
            ),
        });
    }

    if config.sweep.chunk_size == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.chunk_size must be at least 1".to_string(),
        });
    }

    if config.sweep.interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.interval_secs must be positive".to_string(),
        });
    }

    if config.assistant.classifier_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "assistant.classifier_timeout_secs must be positive".to_string(),
        });
    }

    if config.identity.token_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "identity.token_ttl_secs must be positive".to_string(),
        });
    }

    if config.widget.ended_message.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "widget.ended_message must not be empty".to_string(),
        });
    }

    if config.widget.handoff_offer.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "widget.handoff_offer must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
