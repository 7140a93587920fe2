// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wicket.toml` > `~/.config/wicket/wicket.toml` > `/etc/wicket/wicket.toml`
//! with environment variable overrides via `WICKET_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WicketConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wicket/wicket.toml` (system-wide)
/// 3. `~/.config/wicket/wicket.toml` (user XDG config)
/// 4. `./wicket.toml` (local directory)
/// 5. `WICKET_*` environment variables
pub fn load_config() -> Result<WicketConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::file("/etc/wicket/wicket.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wicket/wicket.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wicket.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WicketConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WicketConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WICKET_WIDGET_WELCOME_MESSAGE` must map
/// to `widget.welcome_message`, not `widget.welcome.message`.
fn env_provider() -> Env {
    Env::prefixed("WICKET_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WICKET_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("widget_", "widget.", 1)
            .replacen("assistant_", "assistant.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("identity_", "identity.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("sweep_", "sweep.", 1);
        mapped.into()
    })
}
