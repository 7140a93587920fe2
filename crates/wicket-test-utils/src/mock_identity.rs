// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock identity issuer for deterministic testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use wicket_core::types::{AdapterType, AuthToken, HealthStatus, VisitorIdentity};
use wicket_core::{Adapter, IdentityIssuer, WicketError};

/// Issues sequential `visitor-N` identities and unique tokens.
///
/// Flip [`MockIdentityIssuer::set_fail`] to simulate issuance failures.
pub struct MockIdentityIssuer {
    counter: AtomicU64,
    token_counter: AtomicU64,
    fail: AtomicBool,
}

impl MockIdentityIssuer {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            token_counter: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of identities issued so far.
    pub fn issued_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Number of tokens minted so far.
    pub fn minted_count(&self) -> u64 {
        self.token_counter.load(Ordering::SeqCst)
    }

    fn check_fail(&self) -> Result<(), WicketError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WicketError::Identity {
                message: "mock issuance failure".into(),
                source: None,
            });
        }
        Ok(())
    }
}

impl Default for MockIdentityIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockIdentityIssuer {
    fn name(&self) -> &str {
        "mock-identity"
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
impl IdentityIssuer for MockIdentityIssuer {
    async fn issue_identity(&self) -> Result<VisitorIdentity, WicketError> {
        self.check_fail()?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(VisitorIdentity {
            visitor_id: format!("visitor-{n}"),
        })
    }

    async fn mint_token(&self, visitor_id: &str) -> Result<AuthToken, WicketError> {
        self.check_fail()?;
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AuthToken {
            token: format!("token-{visitor_id}-{n}"),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identities_are_sequential() {
        let issuer = MockIdentityIssuer::new();
        assert_eq!(issuer.issue_identity().await.unwrap().visitor_id, "visitor-1");
        assert_eq!(issuer.issue_identity().await.unwrap().visitor_id, "visitor-2");
        assert_eq!(issuer.issued_count(), 2);
    }

    #[tokio::test]
    async fn tokens_are_unique_per_mint() {
        let issuer = MockIdentityIssuer::new();
        let a = issuer.mint_token("visitor-1").await.unwrap();
        let b = issuer.mint_token("visitor-1").await.unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(issuer.minted_count(), 2);
    }

    #[tokio::test]
    async fn failure_mode_rejects_both_operations() {
        let issuer = MockIdentityIssuer::new();
        issuer.set_fail(true);
        assert!(issuer.issue_identity().await.is_err());
        assert!(issuer.mint_token("visitor-1").await.is_err());

        issuer.set_fail(false);
        assert!(issuer.issue_identity().await.is_ok());
    }
}
