use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use shared_models::error::AppError;

use crate::models::{extract_message_info, AppState, VerifyParams, WatiInboundEvent};

/// Provider verification handshake: echo the challenge when the shared
/// verify token matches.
#[axum::debug_handler]
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, AppError> {
    let token_matches = params.verify_token.as_deref() == Some(state.config.verify_token.as_str())
        && !state.config.verify_token.is_empty();

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        info!("Webhook verified");
        return Ok(params.challenge.unwrap_or_default());
    }

    Err(AppError::Forbidden("Invalid verify token".to_string()))
}

/// Inbound message webhook. One request = one state-machine step: resolve the
/// sender's session, step the dialog, persist the new state, send the replies.
/// Always acknowledges with 200 — a non-2xx would make the provider redeliver
/// the same message and replay the dialog step.
#[axum::debug_handler]
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    Json(event): Json<WatiInboundEvent>,
) -> Json<Value> {
    let Some(message) = extract_message_info(&event) else {
        return Json(json!({ "status": "ignored" }));
    };

    let current = state.sessions.get(&message.sender);
    let (next, replies) = state
        .dialog
        .handle_message(current, &message.text, &message.sender)
        .await;
    state.sessions.set(&message.sender, next);

    for reply in &replies {
        if let Err(e) = state.sender.send_text(&message.sender, reply).await {
            warn!("Failed to send reply to {}: {}", message.sender, e);
        }
    }

    Json(json!({ "status": "ok" }))
}
