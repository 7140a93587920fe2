// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anonymous visitor identity and token issuance.
//!
//! Two implementations of `wicket-core`'s `IdentityIssuer` seam:
//! [`HttpIdentityIssuer`] for an external issuance service, and
//! [`LocalIssuer`], an HMAC-signed fallback selected when no service is
//! configured.

pub mod client;
pub mod local;

use std::sync::Arc;

use wicket_config::model::IdentityConfig;
use wicket_core::{IdentityIssuer, WicketError};

pub use client::HttpIdentityIssuer;
pub use local::LocalIssuer;

/// Build the issuer selected by configuration: the external HTTP service
/// when `base_url` is set, the local HMAC issuer otherwise.
pub fn issuer_from_config(
    config: &IdentityConfig,
) -> Result<Arc<dyn IdentityIssuer>, WicketError> {
    match &config.base_url {
        Some(base_url) => Ok(Arc::new(HttpIdentityIssuer::new(base_url)?)),
        None => Ok(Arc::new(LocalIssuer::new(config))),
    }
}
