// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in identity issuer for deployments without an external service.
//!
//! Visitor ids are random UUIDs; tokens are `visitor_id.expiry.hmac` with
//! an HMAC-SHA256 tag over the first two segments. Tokens are short-lived
//! and never persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use wicket_config::model::IdentityConfig;
use wicket_core::types::{AdapterType, AuthToken, HealthStatus, VisitorIdentity};
use wicket_core::{Adapter, IdentityIssuer, WicketError};

type HmacSha256 = Hmac<Sha256>;

/// Local HMAC-signed token issuer.
pub struct LocalIssuer {
    secret: Vec<u8>,
    token_ttl: chrono::Duration,
}

impl LocalIssuer {
    /// Build from configuration.
    ///
    /// Without a configured secret a random one is generated at startup, so
    /// tokens do not survive a restart -- fine for the short-lived tokens
    /// bootstrap mints on every call.
    pub fn new(config: &IdentityConfig) -> Self {
        let secret = match &config.secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                let mut bytes = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                debug!("no identity secret configured, generated an ephemeral one");
                bytes
            }
        };
        Self {
            secret,
            token_ttl: chrono::Duration::seconds(config.token_ttl_secs as i64),
        }
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify a token and return the visitor id it is bound to.
    ///
    /// Rejects malformed tokens, bad signatures, and expired tokens.
    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        let mut parts = token.rsplitn(2, '.');
        let tag = parts.next()?;
        let payload = parts.next()?;
        if self.sign(payload) != tag {
            return None;
        }
        let (visitor_id, expiry) = payload.rsplit_once('.')?;
        let expiry: i64 = expiry.parse().ok()?;
        if now.timestamp() > expiry {
            return None;
        }
        Some(visitor_id.to_string())
    }
}

#[async_trait]
impl Adapter for LocalIssuer {
    fn name(&self) -> &str {
        "local-identity"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, WicketError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WicketError> {
        Ok(())
    }
}

#[async_trait]
impl IdentityIssuer for LocalIssuer {
    async fn issue_identity(&self) -> Result<VisitorIdentity, WicketError> {
        Ok(VisitorIdentity {
            visitor_id: format!("v_{}", Uuid::new_v4().simple()),
        })
    }

    async fn mint_token(&self, visitor_id: &str) -> Result<AuthToken, WicketError> {
        let expires_at = Utc::now() + self.token_ttl;
        let payload = format!("{visitor_id}.{}", expires_at.timestamp());
        let tag = self.sign(&payload);
        Ok(AuthToken {
            token: format!("{payload}.{tag}"),
            expires_at,
        })
    }
}
