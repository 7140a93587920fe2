// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared-secret middleware for the operator and sweep route groups.
//!
//! With no secret configured the group is open -- the widget routes must
//! stay public for visitors, staff authentication lives upstream, and the
//! sweep trigger is explicitly unauthenticated-or-shared-secret. With a
//! secret set, requests need `Authorization: Bearer <secret>`.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Shared-secret configuration for one route group.
#[derive(Clone)]
pub struct SecretConfig {
    /// Expected bearer secret. `None` disables the check.
    pub secret: Option<String>,
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Middleware validating the shared secret when one is configured.
pub async fn secret_middleware(
    State(config): State<SecretConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = &config.secret else {
        return Ok(next.run(request).await);
    };

    let bearer = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_secret_means_open() {
        let config = SecretConfig { secret: None };
        assert!(config.secret.is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = SecretConfig {
            secret: Some("cron-secret".to_string()),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("cron-secret"));
        assert!(debug_output.contains("[redacted]"));
    }
}
