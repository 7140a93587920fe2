// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Widget flows (bootstrap, respond) answer with structured
//! success/failure payloads instead of letting orchestration errors escape
//! as transport errors; only malformed input fails fast with a client
//! error. Operator and sweep handlers map error kinds onto HTTP statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use wicket_core::types::{ClientParams, TypingParty};
use wicket_core::{ConversationStatus, WicketError};

use crate::server::GatewayState;

/// Request body for POST /v1/widget/bootstrap.
#[derive(Debug, Deserialize)]
pub struct BootstrapBody {
    pub chat_id: String,
    pub origin: String,
    #[serde(default)]
    pub params: Option<ClientParams>,
}

/// Response body for POST /v1/widget/bootstrap.
#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
    pub message: String,
}

/// Request body for POST /v1/widget/respond.
#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub conversation_id: String,
    pub message: String,
}

/// Response body for POST /v1/widget/respond.
#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub status: String,
}

/// Request body for POST /v1/widget/typing.
#[derive(Debug, Deserialize)]
pub struct TypingBody {
    pub conversation_id: String,
    pub party: TypingParty,
    pub is_typing: bool,
}

/// Request body for POST /v1/conversations/{id}/join.
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub operator_id: String,
}

/// Request body for POST /v1/conversations/{id}/message.
#[derive(Debug, Deserialize)]
pub struct OperatorMessageBody {
    pub text: String,
}

/// Query parameters for GET /v1/conversations.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
}

/// Response body for POST /v1/sweep.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub ended: usize,
    pub deactivated: usize,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Map an engine error onto an HTTP status for operator/sweep routes.
fn error_status(err: &WicketError) -> StatusCode {
    match err {
        WicketError::NotFound { .. } => StatusCode::NOT_FOUND,
        WicketError::InvalidTransition { .. } => StatusCode::CONFLICT,
        WicketError::DomainRejected { .. } => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: WicketError) -> Response {
    let status = error_status(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// POST /v1/widget/bootstrap
pub async fn post_bootstrap(
    State(state): State<GatewayState>,
    Json(body): Json<BootstrapBody>,
) -> Response {
    // Malformed input fails fast; everything downstream is a structured
    // success/failure payload.
    if body.chat_id.trim().is_empty() {
        return bad_request("chat_id is required");
    }
    if body.origin.trim().is_empty() {
        return bad_request("origin is required");
    }

    let request = wicket_engine::BootstrapRequest {
        chat_id: body.chat_id,
        origin: body.origin,
        params: body.params.unwrap_or_default(),
    };
    match state.bootstrapper.bootstrap(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(BootstrapResponse {
                success: true,
                conversation_id: Some(outcome.conversation_id),
                visitor_id: Some(outcome.visitor_id),
                token: Some(outcome.token.token),
                welcome_message: Some(outcome.welcome_message),
                message: "ok".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            // The visitor gets a generic failure; detail goes to the log.
            warn!(error = %err, "bootstrap rejected");
            (
                StatusCode::OK,
                Json(BootstrapResponse {
                    success: false,
                    conversation_id: None,
                    visitor_id: None,
                    token: None,
                    welcome_message: None,
                    message: "Unable to start the chat session.".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /v1/widget/respond
pub async fn post_respond(
    State(state): State<GatewayState>,
    Json(body): Json<RespondBody>,
) -> Response {
    if body.conversation_id.trim().is_empty() {
        return bad_request("conversation_id is required");
    }
    if body.message.trim().is_empty() {
        return bad_request("message is required");
    }

    match state
        .negotiator
        .respond(&body.conversation_id, &body.message)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RespondResponse {
                success: true,
                response: outcome.reply.unwrap_or_default(),
                confidence: outcome.confidence,
                status: outcome.status.to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/widget/typing
pub async fn post_typing(
    State(state): State<GatewayState>,
    Json(body): Json<TypingBody>,
) -> Response {
    if body.conversation_id.trim().is_empty() {
        return bad_request("conversation_id is required");
    }
    match state
        .typing
        .set_typing(&body.conversation_id, body.party, body.is_typing)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/conversations
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.store.list_conversations(query.status).await {
        Ok(conversations) => (StatusCode::OK, Json(conversations)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /v1/conversations/{id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.messages(&id, None).await {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/conversations/{id}/join
pub async fn post_join(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<JoinBody>,
) -> Response {
    if body.operator_id.trim().is_empty() {
        return bad_request("operator_id is required");
    }
    match state.lifecycle.operator_join(&id, &body.operator_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/conversations/{id}/leave
pub async fn post_leave(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.lifecycle.operator_leave(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/conversations/{id}/close
pub async fn post_close(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    match state.lifecycle.close(&id).await {
        Ok(_closed) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/conversations/{id}/message
pub async fn post_operator_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<OperatorMessageBody>,
) -> Response {
    if body.text.trim().is_empty() {
        return bad_request("text is required");
    }
    match state.lifecycle.operator_message(&id, &body.text).await {
        Ok(message) => (StatusCode::OK, Json(message)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /v1/sweep
///
/// Idempotent batch sweep trigger for the external scheduler.
pub async fn post_sweep(State(state): State<GatewayState>) -> Response {
    match state.sweeper.sweep(Utc::now()).await {
        Ok(report) => (
            StatusCode::OK,
            Json(SweepResponse {
                ended: report.ended,
                deactivated: report.deactivated,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}
