//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the health check and the chat session endpoints,
//! and the master definition for the OpenAPI specification.

use crate::web::{
    images, learn,
    protocol::{
        AskRequest, CreateSessionRequest, CurrentSessionPayload, ImageRequest, ImageResponse,
        LearnRequest, LearnResponse, MountQuizRequest, QuizPhaseDto, QuizStateResponse,
        SubmitQuizRequest, SubmitQuizResponse,
    },
    quiz,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        learn::learn_handler,
        learn::ask_handler,
        list_sessions_handler,
        create_session_handler,
        get_session_handler,
        delete_session_handler,
        get_current_session_handler,
        set_current_session_handler,
        quiz::list_quiz_results_handler,
        quiz::quiz_summary_handler,
        quiz::mount_quiz_handler,
        quiz::submit_quiz_handler,
        images::generate_image_handler,
    ),
    components(
        schemas(
            LearnRequest, LearnResponse, AskRequest, CreateSessionRequest, CurrentSessionPayload,
            MountQuizRequest, SubmitQuizRequest, QuizPhaseDto, QuizStateResponse,
            SubmitQuizResponse, ImageRequest, ImageResponse
        )
    ),
    tags(
        (
            name = "E-Learning Assistant API",
            description = "Learning content proxy, chat sessions and quizzes."
        )
    )
)]
pub struct ApiDoc;

pub(crate) fn not_found(what: &str, id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} {} not found", what, id))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Server is running")))]
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "Backend server is running" }))
}

/// List all chat sessions, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses((status = 200, description = "Sessions sorted by lastUpdated, descending"))
)]
pub async fn list_sessions_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = app_state.store.lock().await;
    Json(store.get_sorted_sessions())
}

/// Create an empty session and make it the current one.
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses((status = 201, description = "Session created"))
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    body: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let Json(req) = body.unwrap_or_default();
    let store = app_state.store.lock().await;
    let session = store.create_new_session(req.title.as_deref());
    (StatusCode::CREATED, Json(session))
}

/// Fetch one session with its transcript.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session"),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = app_state.store.lock().await;
    store
        .get_chat_session(&id)
        .map(Json)
        .ok_or_else(|| not_found("Session", &id))
}

/// Delete a session and its quiz history.
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session and quiz results deleted"),
        (status = 404, description = "No such session"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let store = app_state.store.lock().await;
    if store.get_chat_session(&id).is_none() {
        return Err(not_found("Session", &id));
    }
    if !store.delete_chat_session(&id) {
        error!("Failed to delete session {}", id);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete session".to_string(),
        ));
    }
    info!("Session {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// The id of the session the client last worked in.
#[utoipa::path(
    get,
    path = "/api/sessions/current",
    responses(
        (
            status = 200,
            description = "Current session id (may be null)",
            body = CurrentSessionPayload
        )
    )
)]
pub async fn get_current_session_handler(
    State(app_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = app_state.store.lock().await;
    Json(CurrentSessionPayload {
        session_id: store.get_current_session_id(),
    })
}

/// Switch the current session.
#[utoipa::path(
    put,
    path = "/api/sessions/current",
    request_body = CurrentSessionPayload,
    responses(
        (status = 204, description = "Current session updated"),
        (status = 400, description = "Missing session id"),
        (status = 404, description = "No such session")
    )
)]
pub async fn set_current_session_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CurrentSessionPayload>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = req
        .session_id
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "sessionId is required".to_string()))?;
    let store = app_state.store.lock().await;
    if store.get_chat_session(&id).is_none() {
        return Err(not_found("Session", &id));
    }
    if !store.set_current_session_id(&id) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to set current session".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
