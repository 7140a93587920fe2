// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session bootstrap for incoming widget embeds.
//!
//! Resolves or creates a conversation for a widget session: domain-trust
//! verification, dedup by external chat id, identity issuance, and token
//! minting. Tokens are never persisted -- every bootstrap call mints a
//! fresh one, resumed or not.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use wicket_config::model::WidgetConfig;
use wicket_core::types::{AuthToken, ClientParams, Conversation};
use wicket_core::{ConversationEvent, ConversationStore, EventBus, IdentityIssuer, WicketError};

use crate::allowlist::{origin_host, DomainAllowlist};

/// Input to a bootstrap call.
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    /// Caller-supplied chat identifier used for session resumption.
    pub chat_id: String,
    /// Origin of the embedding page (URL or hostname).
    pub origin: String,
    /// Opaque pass-through parameters from the embedding page.
    pub params: ClientParams,
}

/// Result of a successful bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapOutcome {
    pub conversation_id: String,
    pub visitor_id: String,
    pub token: AuthToken,
    pub welcome_message: String,
    /// True when an existing conversation was resumed.
    pub resumed: bool,
}

/// Resolves or creates a conversation for an incoming widget session.
pub struct SessionBootstrapper {
    store: Arc<dyn ConversationStore>,
    identity: Arc<dyn IdentityIssuer>,
    allowlist: DomainAllowlist,
    welcome_message: String,
    events: EventBus,
}

impl SessionBootstrapper {
    /// Build a bootstrapper from widget configuration.
    ///
    /// Fails only on an invalid allowlist pattern; an empty allowlist
    /// compiles to allow-all with the default welcome message.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        identity: Arc<dyn IdentityIssuer>,
        widget: &WidgetConfig,
        events: EventBus,
    ) -> Result<Self, WicketError> {
        Ok(Self {
            store,
            identity,
            allowlist: DomainAllowlist::new(&widget.allowed_domains)?,
            welcome_message: widget.welcome_message.clone(),
            events,
        })
    }

    /// Bootstrap a widget session.
    ///
    /// At most one conversation and one identity are created per distinct
    /// chat id. The lookup-then-create dedup is not transactional:
    /// concurrent first contacts with the same never-seen chat id can race
    /// into duplicate conversations, an accepted race resolved by whichever
    /// record subsequent lookups return.
    pub async fn bootstrap(
        &self,
        request: BootstrapRequest,
    ) -> Result<BootstrapOutcome, WicketError> {
        let host = origin_host(&request.origin).ok_or_else(|| WicketError::DomainRejected {
            origin: request.origin.clone(),
        })?;
        if !self.allowlist.is_allowed(&host) {
            return Err(WicketError::DomainRejected { origin: host });
        }

        if let Some(existing) = self
            .store
            .find_active_by_external_id(&request.chat_id)
            .await?
        {
            let token = self.identity.mint_token(&existing.visitor_id).await?;
            debug!(
                conversation_id = %existing.id,
                chat_id = %request.chat_id,
                "session resumed"
            );
            return Ok(BootstrapOutcome {
                conversation_id: existing.id,
                visitor_id: existing.visitor_id,
                token,
                welcome_message: self.welcome_message.clone(),
                resumed: true,
            });
        }

        let identity = self.identity.issue_identity().await?;
        let conversation = Conversation::new(
            Uuid::new_v4().to_string(),
            request.chat_id.clone(),
            identity.visitor_id.clone(),
            request.params,
            Utc::now(),
        );
        self.store.create_conversation(&conversation).await?;
        self.events.publish(ConversationEvent::Created {
            conversation_id: conversation.id.clone(),
        });
        info!(
            conversation_id = %conversation.id,
            chat_id = %request.chat_id,
            origin = %host,
            "conversation created"
        );

        let token = self.identity.mint_token(&identity.visitor_id).await?;
        Ok(BootstrapOutcome {
            conversation_id: conversation.id,
            visitor_id: identity.visitor_id,
            token,
            welcome_message: self.welcome_message.clone(),
            resumed: false,
        })
    }
}
