// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: the full gateway served over HTTP against a real
//! SQLite store, with mock assistant and identity adapters.

use std::sync::Arc;
use std::time::Duration;

use wicket_config::model::{AssistantConfig, SweepConfig, WidgetConfig};
use wicket_core::{EventBus, HandoffIntent};
use wicket_engine::{
    ConversationLifecycle, HandoffNegotiator, IdleSweeper, SessionBootstrapper,
    TypingPresenceTracker,
};
use wicket_gateway::{GatewayState, HealthState, ServerConfig};
use wicket_storage::SqliteConversationStore;
use wicket_test_utils::{MockAssistant, MockIdentityIssuer};

struct TestApp {
    base: String,
    client: reqwest::Client,
    assistant: Arc<MockAssistant>,
    _dir: tempfile::TempDir,
}

async fn spawn_app(widget: WidgetConfig, sweep_secret: Option<String>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("e2e.db");
    let store = Arc::new(SqliteConversationStore::new(
        wicket_config::model::StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        },
    ));
    store.initialize().await.unwrap();

    let assistant = Arc::new(MockAssistant::new());
    let identity = Arc::new(MockIdentityIssuer::new());
    let events = EventBus::new();

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
        assistant.clone(),
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
        Duration::from_secs(5),
    ));

    let state = GatewayState {
        store,
        bootstrapper,
        negotiator,
        lifecycle,
        sweeper,
        typing,
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        operator_secret: Some("staff-secret".to_string()),
        sweep_secret,
    };

    let app = wicket_gateway::router(&config, state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        assistant,
        _dir: dir,
    }
}

async fn bootstrap(app: &TestApp, chat_id: &str, origin: &str) -> serde_json::Value {
    app.client
        .post(format!("{}/v1/widget/bootstrap", app.base))
        .json(&serde_json::json!({"chat_id": chat_id, "origin": origin}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn respond(app: &TestApp, conversation_id: &str, message: &str) -> serde_json::Value {
    app.client
        .post(format!("{}/v1/widget/respond", app.base))
        .json(&serde_json::json!({"conversation_id": conversation_id, "message": message}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = spawn_app(WidgetConfig::default(), None).await;
    let response = app
        .client
        .get(format!("{}/health", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn full_visitor_journey_with_handoff() {
    let widget = WidgetConfig {
        allowed_domains: vec!["*.example.com".to_string()],
        ..WidgetConfig::default()
    };
    let texts = widget.clone();
    let app = spawn_app(widget, None).await;

    // Bootstrap creates a conversation; a second call resumes it.
    let first = bootstrap(&app, "abc", "https://shop.example.com").await;
    assert_eq!(first["success"], true);
    assert_eq!(first["welcome_message"], texts.welcome_message);
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();
    assert!(first["token"].as_str().unwrap().len() > 8);

    let second = bootstrap(&app, "abc", "https://shop.example.com").await;
    assert_eq!(second["conversation_id"].as_str().unwrap(), conversation_id);
    assert_eq!(second["visitor_id"], first["visitor_id"]);
    assert_ne!(second["token"], first["token"]);

    // Assistant offers a handoff verbatim: conversation turns pending.
    app.assistant.add_reply(&texts.handoff_offer, None).await;
    let offer = respond(&app, &conversation_id, "i want to talk to a human").await;
    assert_eq!(offer["status"], "pending");
    assert_eq!(offer["response"], texts.handoff_offer);

    // Visitor confirms: flag clears, status stays pending, canonical
    // connecting text comes back.
    app.assistant.add_intent(HandoffIntent::Positive).await;
    let confirmed = respond(&app, &conversation_id, "po").await;
    assert_eq!(confirmed["status"], "pending");
    assert_eq!(confirmed["response"], texts.connecting_message);

    // Operator joins (gated route) and owns the conversation.
    let join = app
        .client
        .post(format!(
            "{}/v1/conversations/{conversation_id}/join",
            app.base
        ))
        .bearer_auth("staff-secret")
        .json(&serde_json::json!({"operator_id": "op-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(join.status(), 204);

    // While the operator is active the assistant stays silent.
    let silent = respond(&app, &conversation_id, "thanks!").await;
    assert_eq!(silent["status"], "active");
    assert_eq!(silent["response"], "");

    // Operator replies, then leaves; the assistant resumes.
    let message = app
        .client
        .post(format!(
            "{}/v1/conversations/{conversation_id}/message",
            app.base
        ))
        .bearer_auth("staff-secret")
        .json(&serde_json::json!({"text": "Happy to help!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(message.status(), 200);

    let leave = app
        .client
        .post(format!(
            "{}/v1/conversations/{conversation_id}/leave",
            app.base
        ))
        .bearer_auth("staff-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(leave.status(), 204);

    app.assistant.add_reply("Back with you!", None).await;
    let resumed = respond(&app, &conversation_id, "ok").await;
    assert_eq!(resumed["status"], "ai");
    assert_eq!(resumed["response"], "Back with you!");

    // Close is idempotent and leaves exactly one terminal system message.
    for _ in 0..2 {
        let close = app
            .client
            .post(format!(
                "{}/v1/conversations/{conversation_id}/close",
                app.base
            ))
            .bearer_auth("staff-secret")
            .send()
            .await
            .unwrap();
        assert_eq!(close.status(), 204);
    }

    let messages: serde_json::Value = app
        .client
        .get(format!(
            "{}/v1/conversations/{conversation_id}/messages",
            app.base
        ))
        .bearer_auth("staff-secret")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = messages.as_array().unwrap();
    let ended_count = messages
        .iter()
        .filter(|m| m["content"] == texts.ended_message)
        .count();
    assert_eq!(ended_count, 1);
}

#[tokio::test]
async fn rejected_origin_gets_structured_failure() {
    let widget = WidgetConfig {
        allowed_domains: vec!["*.example.com".to_string()],
        ..WidgetConfig::default()
    };
    let app = spawn_app(widget, None).await;

    let body = bootstrap(&app, "abc", "https://attacker.net").await;
    assert_eq!(body["success"], false);
    assert!(body.get("token").is_none());
    assert!(body.get("conversation_id").is_none());
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_bootstrap_fails_fast() {
    let app = spawn_app(WidgetConfig::default(), None).await;
    let response = app
        .client
        .post(format!("{}/v1/widget/bootstrap", app.base))
        .json(&serde_json::json!({"chat_id": "", "origin": "https://x.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn sweep_trigger_honors_shared_secret() {
    let app = spawn_app(WidgetConfig::default(), Some("cron-secret".to_string())).await;

    let unauthorized = app
        .client
        .post(format!("{}/v1/sweep", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    let authorized = app
        .client
        .post(format!("{}/v1/sweep", app.base))
        .bearer_auth("cron-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(authorized.status(), 200);
    let body: serde_json::Value = authorized.json().await.unwrap();
    assert_eq!(body["ended"], 0);
    assert_eq!(body["deactivated"], 0);
}

#[tokio::test]
async fn operator_routes_reject_wrong_secret() {
    let app = spawn_app(WidgetConfig::default(), None).await;
    let response = app
        .client
        .get(format!("{}/v1/conversations", app.base))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = app
        .client
        .get(format!("{}/v1/conversations", app.base))
        .bearer_auth("staff-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn typing_signal_round_trips() {
    let app = spawn_app(WidgetConfig::default(), None).await;
    let body = bootstrap(&app, "typ-1", "https://shop.example.com").await;
    let conversation_id = body["conversation_id"].as_str().unwrap();

    let response = app
        .client
        .post(format!("{}/v1/widget/typing", app.base))
        .json(&serde_json::json!({
            "conversation_id": conversation_id,
            "party": "visitor",
            "is_typing": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}
