//! services/api/src/web/learn.rs
//!
//! Handlers that forward learning requests to the content pipeline: the raw proxy
//! endpoint, and the transcript-aware "ask" endpoint that records the exchange in
//! a chat session.

use crate::web::{
    protocol::{AskRequest, LearnRequest, LearnResponse},
    rest::not_found,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use elearning_core::{
    domain::{ErrorContent, Message, MessageContent, StructuredContent},
    ports::PortError,
    prompt::{content_error_message, continue_learning_prompt},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Maps a failed pipeline call onto the status and body the client expects.
pub fn proxy_error(e: &PortError) -> (StatusCode, Json<Value>) {
    match e {
        PortError::Upstream { status, body } => {
            let details: Value =
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()));
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                code,
                Json(json!({
                    "error": "Airia API Error",
                    "status": status,
                    "message": details,
                    "details": details,
                })),
            )
        }
        PortError::Unavailable(message) | PortError::Timeout(message) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No response from Airia", "message": message })),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Server error", "message": other.to_string() })),
        ),
    }
}

/// Forward a topic to the content pipeline.
#[utoipa::path(
    post,
    path = "/api/learn",
    request_body = LearnRequest,
    responses(
        (status = 200, description = "Generated learning material", body = LearnResponse),
        (status = 400, description = "userInput is missing"),
        (status = 503, description = "No response from the pipeline"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn learn_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<LearnRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    if req.user_input.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "userInput is required" })),
        ));
    }

    let user_input = match &req.quiz_summary {
        Some(summary) => continue_learning_prompt(&req.user_input, summary),
        None => req.user_input.clone(),
    };

    match app_state.content_adapter.request_learning(&user_input).await {
        Ok(data) => Ok(Json(LearnResponse { data })),
        Err(e) => {
            error!("Learning request failed: {}", e);
            Err(proxy_error(&e))
        }
    }
}

/// Ask a question inside a session. The user message and the bot's answer (or a
/// bot-authored error) are appended to the transcript.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/ask",
    request_body = AskRequest,
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Updated session including the bot reply"),
        (status = 400, description = "Empty prompt"),
        (status = 404, description = "No such session")
    )
)]
pub async fn ask_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prompt = req.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "prompt is required".to_string()));
    }

    // --- 1. Record the user's message ---
    let user_input = {
        let store = app_state.store.lock().await;
        if store.get_chat_session(&id).is_none() {
            return Err(not_found("Session", &id));
        }
        store.set_current_session_id(&id);

        let summary = if req.include_quiz_results {
            store.get_quiz_summary(&id)
        } else {
            None
        };
        let user_input = match &summary {
            Some(summary) => continue_learning_prompt(&prompt, summary),
            None => prompt.clone(),
        };

        let mut message = Message::user(store.next_message_id(&id), prompt.clone());
        message.original_prompt = Some(prompt.clone());
        message.include_quiz_results = Some(summary.is_some());
        store.append_message(&id, message);
        user_input
    };

    // --- 2. Call the pipeline without holding the store ---
    let content = match app_state.content_adapter.request_learning(&user_input).await {
        Ok(data) => match serde_json::from_value::<StructuredContent>(data.clone()) {
            Ok(structured) => MessageContent::Structured(structured),
            Err(_) => MessageContent::Text(match data {
                Value::String(text) => text,
                other => other.to_string(),
            }),
        },
        Err(e) => {
            warn!("Content request for session {} failed: {}", id, e);
            MessageContent::Error(ErrorContent {
                error: true,
                message: content_error_message(&e),
                details: Some(json!({ "status": e.status(), "message": e.to_string() })),
            })
        }
    };

    // --- 3. Record the bot's reply ---
    let store = app_state.store.lock().await;
    let reply = Message::bot(store.next_message_id(&id), content);
    let session = store
        .append_message(&id, reply)
        .ok_or_else(|| not_found("Session", &id))?;
    info!("Session {} now has {} messages", id, session.messages.len());
    Ok(Json(session))
}
