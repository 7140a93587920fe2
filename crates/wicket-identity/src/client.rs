// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an external identity issuance service.
//!
//! The service owns anonymous visitor identities and short-lived tokens;
//! Wicket only consumes it. Calls carry a short timeout -- identity
//! issuance is fatal to bootstrap, so failures surface quickly instead of
//! hanging the widget.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use wicket_core::types::{AdapterType, AuthToken, HealthStatus, VisitorIdentity};
use wicket_core::{Adapter, IdentityIssuer, WicketError};

/// Request timeout for issuance calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    visitor_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Client for the external identity issuance service.
pub struct HttpIdentityIssuer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityIssuer {
    pub fn new(base_url: &str) -> Result<Self, WicketError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WicketError::Identity {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, WicketError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WicketError::Identity {
                message: format!("identity service unreachable: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WicketError::Identity {
                message: format!("identity service returned {status}: {body}"),
                source: None,
            });
        }
        response.json::<T>().await.map_err(|e| WicketError::Identity {
            message: format!("unparseable identity service response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl Adapter for HttpIdentityIssuer {
    fn name(&self) -> &str {
        "http-identity"
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
impl IdentityIssuer for HttpIdentityIssuer {
    async fn issue_identity(&self) -> Result<VisitorIdentity, WicketError> {
        let response: IdentityResponse = self
            .post_json("/v1/identities", serde_json::json!({}))
            .await?;
        debug!(visitor_id = %response.visitor_id, "anonymous identity issued");
        Ok(VisitorIdentity {
            visitor_id: response.visitor_id,
        })
    }

    async fn mint_token(&self, visitor_id: &str) -> Result<AuthToken, WicketError> {
        let response: TokenResponse = self
            .post_json(
                "/v1/tokens",
                serde_json::json!({ "visitor_id": visitor_id }),
            )
            .await?;
        Ok(AuthToken {
            token: response.token,
            expires_at: response.expires_at,
        })
    }
}
