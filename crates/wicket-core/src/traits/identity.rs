// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity issuer trait for anonymous visitor identities and tokens.

use async_trait::async_trait;

use crate::error::WicketError;
use crate::traits::adapter::Adapter;
use crate::types::{AuthToken, VisitorIdentity};

/// Seam to the anonymous-identity/token issuance service.
#[async_trait]
pub trait IdentityIssuer: Adapter {
    /// Create a new anonymous visitor identity.
    async fn issue_identity(&self) -> Result<VisitorIdentity, WicketError>;

    /// Mint a short-lived auth token bound to a visitor identity.
    ///
    /// Tokens are not persisted; session bootstrap mints a fresh one on
    /// every call, for resumed and new conversations alike.
    async fn mint_token(&self, visitor_id: &str) -> Result<AuthToken, WicketError>;
}
