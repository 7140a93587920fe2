// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain allowlist matching for widget embeds.
//!
//! Patterns are hostnames with `*` as a wildcard matching any substring
//! (typically a subdomain label). Matching is anchored (full-hostname, not
//! substring) and case-insensitive. A bare `*` or an empty pattern list
//! allows all origins -- availability over strictness when no widget
//! configuration exists.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use wicket_core::WicketError;

/// Compiled hostname allowlist.
pub struct DomainAllowlist {
    /// `None` means allow-all.
    set: Option<GlobSet>,
}

impl DomainAllowlist {
    /// Compile a list of hostname glob patterns.
    ///
    /// An empty list or any bare `*` entry compiles to allow-all.
    pub fn new(patterns: &[String]) -> Result<Self, WicketError> {
        let patterns: Vec<&str> = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        if patterns.is_empty() || patterns.contains(&"*") {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    WicketError::Config(format!("invalid allowed domain pattern `{pattern}`: {e}"))
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| {
            WicketError::Config(format!("failed to compile domain allowlist: {e}"))
        })?;
        Ok(Self { set: Some(set) })
    }

    /// Whether a requesting hostname is covered by the allowlist.
    pub fn is_allowed(&self, host: &str) -> bool {
        match &self.set {
            None => true,
            Some(set) => set.is_match(host),
        }
    }

    /// True when every origin is accepted.
    pub fn allows_all(&self) -> bool {
        self.set.is_none()
    }
}

/// Extract the hostname from a widget origin string.
///
/// Accepts full URLs (`https://shop.example.com/page`) and bare hostnames.
pub fn origin_host(origin: &str) -> Option<String> {
    if let Ok(url) = url::Url::parse(origin)
        && let Some(host) = url.host_str()
    {
        return Some(host.to_ascii_lowercase());
    }
    // Bare hostname without a scheme.
    let trimmed = origin.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains(' ') {
        return None;
    }
    let host = trimmed.split(':').next().unwrap_or(trimmed);
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}
