// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Route groups: public widget routes (visitors cannot authenticate),
//! operator routes behind the optional operator secret, and the sweep
//! trigger behind the optional sweep secret.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use wicket_core::{ConversationStore, WicketError};
use wicket_engine::{
    ConversationLifecycle, HandoffNegotiator, IdleSweeper, SessionBootstrapper,
    TypingPresenceTracker,
};

use crate::auth::{secret_middleware, SecretConfig};
use crate::handlers;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn ConversationStore>,
    pub bootstrapper: Arc<SessionBootstrapper>,
    pub negotiator: Arc<HandoffNegotiator>,
    pub lifecycle: Arc<ConversationLifecycle>,
    pub sweeper: Arc<IdleSweeper>,
    pub typing: Arc<TypingPresenceTracker>,
    pub health: HealthState,
}

/// Gateway server configuration (mirrors GatewayConfig from wicket-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind. 0 binds an ephemeral port.
    pub port: u16,
    /// Shared secret for operator routes (None = open).
    pub operator_secret: Option<String>,
    /// Shared secret for the sweep trigger (None = open).
    pub sweep_secret: Option<String>,
}

/// Build the gateway router.
///
/// Exposed separately from [`start_server`] so tests can serve it on their
/// own listener.
pub fn router(config: &ServerConfig, state: GatewayState) -> Router {
    let operator_auth = SecretConfig {
        secret: config.operator_secret.clone(),
    };
    let sweep_auth = SecretConfig {
        secret: config.sweep_secret.clone(),
    };

    // Public routes: the widget cannot authenticate, and health must stay
    // reachable for process supervisors.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/v1/widget/bootstrap", post(handlers::post_bootstrap))
        .route("/v1/widget/respond", post(handlers::post_respond))
        .route("/v1/widget/typing", post(handlers::post_typing))
        .with_state(state.clone());

    let operator_routes = Router::new()
        .route("/v1/conversations", get(handlers::get_conversations))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_messages),
        )
        .route("/v1/conversations/{id}/join", post(handlers::post_join))
        .route("/v1/conversations/{id}/leave", post(handlers::post_leave))
        .route("/v1/conversations/{id}/close", post(handlers::post_close))
        .route(
            "/v1/conversations/{id}/message",
            post(handlers::post_operator_message),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            operator_auth,
            secret_middleware,
        ))
        .with_state(state.clone());

    let sweep_routes = Router::new()
        .route("/v1/sweep", post(handlers::post_sweep))
        .route_layer(axum_middleware::from_fn_with_state(
            sweep_auth,
            secret_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(operator_routes)
        .merge(sweep_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), WicketError> {
    let app = router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WicketError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| WicketError::Internal(format!("failed to read bound address: {e}")))?;
    tracing::info!("gateway listening on {local_addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WicketError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wicket_config::model::{AssistantConfig, SweepConfig, WidgetConfig};
    use wicket_core::EventBus;
    use wicket_test_utils::{MemoryStore, MockAssistant, MockIdentityIssuer};

    fn make_state() -> GatewayState {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let assistant = Arc::new(MockAssistant::new());
        let identity = Arc::new(MockIdentityIssuer::new());
        let events = EventBus::new();
        let widget = WidgetConfig::default();

        let lifecycle = Arc::new(ConversationLifecycle::new(
            store.clone(),
            events.clone(),
            widget.clone(),
        ));
        let bootstrapper = Arc::new(
            SessionBootstrapper::new(store.clone(), identity, &widget, events.clone()).unwrap(),
        );
        let negotiator = Arc::new(HandoffNegotiator::new(
            store.clone(),
            assistant,
            lifecycle.clone(),
            &AssistantConfig::default(),
        ));
        let sweeper = Arc::new(IdleSweeper::new(
            store.clone(),
            events,
            &SweepConfig::default(),
            widget.ended_message.clone(),
        ));
        let typing = Arc::new(TypingPresenceTracker::new(
            store.clone(),
            std::time::Duration::from_secs(5),
        ));

        GatewayState {
            store,
            bootstrapper,
            negotiator,
            lifecycle,
            sweeper,
            typing,
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }

    #[test]
    fn router_builds_with_and_without_secrets() {
        let state = make_state();
        let open = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            operator_secret: None,
            sweep_secret: None,
        };
        let _router = router(&open, state.clone());

        let gated = ServerConfig {
            operator_secret: Some("staff".to_string()),
            sweep_secret: Some("cron".to_string()),
            ..open
        };
        let _router = router(&gated, state);
    }

    #[test]
    fn gateway_state_is_clone() {
        let state = make_state();
        let _cloned = state.clone();
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            operator_secret: None,
            sweep_secret: None,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
