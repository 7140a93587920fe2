// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wicket support-chat platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. Every
//! section is optional and defaults to sensible values; in particular a
//! missing `[widget]` section degrades to allow-all with a default welcome
//! message rather than failing.

use serde::{Deserialize, Serialize};

/// Top-level Wicket configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WicketConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Widget embed settings: domain allowlist and canonical texts.
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Assistant model and classifier settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Visitor identity issuance settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Idle sweep thresholds and scheduling.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "wicket".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. 0 binds an ephemeral port (used in tests).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for operator routes. `None` leaves them open
    /// (staff authentication is handled upstream).
    #[serde(default)]
    pub operator_secret: Option<String>,

    /// Shared secret for the sweep trigger. `None` leaves it open.
    #[serde(default)]
    pub sweep_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            operator_secret: None,
            sweep_secret: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8775
}

/// Widget embed configuration: which origins may open the widget, and the
/// canonical texts the engine writes into conversations.
///
/// The `handoff_offer` text is matched verbatim against assistant replies
/// to detect a handoff offer, so changing it changes detection too.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WidgetConfig {
    /// Hostname glob patterns allowed to embed the widget. `*` matches any
    /// substring; an empty list or a bare `*` allows all origins.
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Greeting returned from session bootstrap.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,

    /// Canonical handoff offer the assistant emits verbatim.
    #[serde(default = "default_handoff_offer")]
    pub handoff_offer: String,

    /// Sent when the visitor confirms a handoff.
    #[serde(default = "default_connecting_message")]
    pub connecting_message: String,

    /// System message appended when an operator joins.
    #[serde(default = "default_operator_joined_message")]
    pub operator_joined_message: String,

    /// System message appended when an operator leaves and the assistant
    /// resumes control.
    #[serde(default = "default_ai_resumed_message")]
    pub ai_resumed_message: String,

    /// Canonical terminal text written when a conversation ends.
    #[serde(default = "default_ended_message")]
    pub ended_message: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            welcome_message: default_welcome_message(),
            handoff_offer: default_handoff_offer(),
            connecting_message: default_connecting_message(),
            operator_joined_message: default_operator_joined_message(),
            ai_resumed_message: default_ai_resumed_message(),
            ended_message: default_ended_message(),
        }
    }
}

fn default_welcome_message() -> String {
    "Hi! How can we help you today?".to_string()
}

fn default_handoff_offer() -> String {
    "Would you like me to connect you with a human agent?".to_string()
}

fn default_connecting_message() -> String {
    "Connecting you with one of our agents. Please hold on a moment.".to_string()
}

fn default_operator_joined_message() -> String {
    "An agent has joined the conversation.".to_string()
}

fn default_ai_resumed_message() -> String {
    "The agent has left the conversation. The assistant will continue helping you.".to_string()
}

fn default_ended_message() -> String {
    "This conversation has ended.".to_string()
}

/// Assistant model and intent-classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Model used for visitor-facing replies.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Model used for the single-label handoff intent classification.
    #[serde(default = "default_small_model")]
    pub classifier_model: String,

    /// Timeout for classifier calls; on expiry the label defaults to OTHER.
    #[serde(default = "default_classifier_timeout_secs")]
    pub classifier_timeout_secs: u64,

    /// Model used for lazy title generation.
    #[serde(default = "default_small_model")]
    pub title_model: String,

    /// How many recent turns feed title generation.
    #[serde(default = "default_title_context_turns")]
    pub title_context_turns: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            classifier_model: default_small_model(),
            classifier_timeout_secs: default_classifier_timeout_secs(),
            title_model: default_small_model(),
            title_context_turns: default_title_context_turns(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_small_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_classifier_timeout_secs() -> u64 {
    3
}

fn default_title_context_turns() -> usize {
    6
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Visitor identity issuance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the external identity issuance service. `None` selects
    /// the built-in local issuer.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Lifetime of minted visitor tokens.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Signing secret for the local issuer. Ignored when `base_url` is set.
    #[serde(default)]
    pub secret: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token_ttl_secs: default_token_ttl_secs(),
            secret: None,
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    3600
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("wicket").join("wicket.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "wicket.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Idle sweep thresholds and scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Idle time after which an `active`/`ai` conversation becomes `inactive`.
    #[serde(default = "default_inactive_after_secs")]
    pub inactive_after_secs: u64,

    /// Idle time after which any non-terminal conversation is ended.
    #[serde(default = "default_ended_after_secs")]
    pub ended_after_secs: u64,

    /// Interval between scheduled sweep passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Maximum conversations closed per atomic batch write.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Staleness TTL for typing presence.
    #[serde(default = "default_typing_ttl_secs")]
    pub typing_ttl_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            inactive_after_secs: default_inactive_after_secs(),
            ended_after_secs: default_ended_after_secs(),
            interval_secs: default_sweep_interval_secs(),
            chunk_size: default_chunk_size(),
            typing_ttl_secs: default_typing_ttl_secs(),
        }
    }
}

fn default_inactive_after_secs() -> u64 {
    300
}

fn default_ended_after_secs() -> u64 {
    10_800
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    100
}

fn default_typing_ttl_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = WicketConfig::default();
        assert_eq!(config.service.name, "wicket");
        assert_eq!(config.service.log_level, "info");
        assert!(config.widget.allowed_domains.is_empty());
        assert_eq!(config.sweep.inactive_after_secs, 300);
        assert_eq!(config.sweep.ended_after_secs, 10_800);
        assert_eq!(config.sweep.chunk_size, 100);
        assert_eq!(config.sweep.typing_ttl_secs, 5);
        assert_eq!(config.assistant.classifier_timeout_secs, 3);
    }

    #[test]
    fn widget_texts_default_nonempty() {
        let widget = WidgetConfig::default();
        for text in [
            &widget.welcome_message,
            &widget.handoff_offer,
            &widget.connecting_message,
            &widget.operator_joined_message,
            &widget.ai_resumed_message,
            &widget.ended_message,
        ] {
            assert!(!text.is_empty());
        }
    }

    #[test]
    fn config_serializes_round_trip() {
        let config = WicketConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: WicketConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.widget.ended_message, config.widget.ended_message);
    }
}
