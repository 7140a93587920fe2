// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wicket serve` and `wicket sweep` command implementations.
//!
//! Wires the SQLite store, the Anthropic assistant, the configured identity
//! issuer, and the engine components into the axum gateway, with the idle
//! sweeper running as a background task. Supports graceful shutdown via
//! SIGINT.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wicket_anthropic::AnthropicAssistant;
use wicket_config::WicketConfig;
use wicket_core::{AssistantAdapter, ConversationStore, EventBus, WicketError};
use wicket_engine::{
    ConversationLifecycle, HandoffNegotiator, IdleSweeper, SessionBootstrapper,
    TypingPresenceTracker,
};
use wicket_gateway::{GatewayState, HealthState, ServerConfig};
use wicket_storage::SqliteConversationStore;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn open_store(config: &WicketConfig) -> Result<Arc<dyn ConversationStore>, WicketError> {
    let store = SqliteConversationStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(Arc::new(store))
}

/// Runs the `wicket serve` command.
pub async fn run_serve(config: WicketConfig) -> Result<(), WicketError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting wicket serve");

    let store = open_store(&config).await?;
    let assistant: Arc<dyn AssistantAdapter> = Arc::new(AnthropicAssistant::new(
        &config.anthropic,
        &config.assistant,
        &config.widget.handoff_offer,
    )?);
    let identity = wicket_identity::issuer_from_config(&config.identity)?;

    let events = EventBus::new();
    let lifecycle = Arc::new(ConversationLifecycle::new(
        store.clone(),
        events.clone(),
        config.widget.clone(),
    ));
    let bootstrapper = Arc::new(SessionBootstrapper::new(
        store.clone(),
        identity,
        &config.widget,
        events.clone(),
    )?);
    let negotiator = Arc::new(HandoffNegotiator::new(
        store.clone(),
        assistant,
        lifecycle.clone(),
        &config.assistant,
    ));
    let sweeper = Arc::new(IdleSweeper::new(
        store.clone(),
        events,
        &config.sweep,
        config.widget.ended_message.clone(),
    ));
    let typing = Arc::new(TypingPresenceTracker::new(
        store.clone(),
        Duration::from_secs(config.sweep.typing_ttl_secs),
    ));

    // The scheduled driver of the sweep; the HTTP trigger shares the same
    // sweeper instance.
    let cancel = CancellationToken::new();
    let sweeper_task = tokio::spawn(sweeper.clone().run(cancel.clone()));

    let state = GatewayState {
        store: store.clone(),
        bootstrapper,
        negotiator,
        lifecycle,
        sweeper,
        typing,
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        operator_secret: config.gateway.operator_secret.clone(),
        sweep_secret: config.gateway.sweep_secret.clone(),
    };

    tokio::select! {
        result = wicket_gateway::start_server(&server_config, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    cancel.cancel();
    if sweeper_task.await.is_err() {
        warn!("sweeper task did not shut down cleanly");
    }
    store.shutdown().await?;
    info!("wicket stopped");
    Ok(())
}

/// Runs the `wicket sweep` command: one sweep pass, print counts, exit.
///
/// Useful as a cron fallback when the serve process is not running.
pub async fn run_sweep_once(config: WicketConfig) -> Result<(), WicketError> {
    init_tracing(&config.service.log_level);

    let store = open_store(&config).await?;
    let sweeper = IdleSweeper::new(
        store.clone(),
        EventBus::new(),
        &config.sweep,
        config.widget.ended_message.clone(),
    );

    let report = sweeper.sweep(chrono::Utc::now()).await?;
    println!(
        "sweep complete: {} ended, {} deactivated",
        report.ended, report.deactivated
    );

    store.shutdown().await?;
    Ok(())
}
