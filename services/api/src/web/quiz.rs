//! services/api/src/web/quiz.rs
//!
//! Quiz endpoints: restore probe, submission, history and summary.

use crate::web::{
    protocol::{MountQuizRequest, QuizStateResponse, SubmitQuizRequest, SubmitQuizResponse},
    rest::not_found,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use elearning_core::{
    domain::FeedbackPayload,
    feedback::relay_feedback,
    quiz::{QuizEngine, SubmitOutcome},
};
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_QUIZ_TITLE: &str = "Quiz";

/// All stored submissions for a session, oldest first.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/quiz-results",
    params(("id" = String, Path, description = "Session id")),
    responses((status = 200, description = "Submission history (empty when none)"))
)]
pub async fn list_quiz_results_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = app_state.store.lock().await;
    Json(store.quiz_results().get_quiz_results(&id))
}

/// Pass/fail breakdown of the latest submission.
#[utoipa::path(
    get,
    path = "/api/sessions/{id}/quiz-summary",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Summary of the latest submission"),
        (status = 404, description = "No submission for this session")
    )
)]
pub async fn quiz_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = app_state.store.lock().await;
    store
        .get_quiz_summary(&id)
        .map(Json)
        .ok_or_else(|| not_found("Quiz result for session", &id))
}

/// Mount a quiz and report whether it comes back already submitted.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/quiz/mount",
    request_body = MountQuizRequest,
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Quiz state after restore", body = QuizStateResponse),
        (status = 404, description = "No such session")
    )
)]
pub async fn mount_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MountQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = app_state.store.lock().await;
    if store.get_chat_session(&id).is_none() {
        return Err(not_found("Session", &id));
    }
    let title = req.title.unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string());
    let engine = QuizEngine::mount(store.quiz_results().clone(), id, title, req.questions);
    Ok(Json(QuizStateResponse::from_engine(&engine)))
}

/// Submit a completed quiz. Submitting a quiz that is already locked for the
/// session returns the stored state and records nothing.
#[utoipa::path(
    post,
    path = "/api/sessions/{id}/quiz/submit",
    request_body = SubmitQuizRequest,
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Quiz scored and stored", body = SubmitQuizResponse),
        (status = 404, description = "No such session"),
        (status = 422, description = "Not every question is answered")
    )
)]
pub async fn submit_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // --- 1. Score and persist under the store lock ---
    let (state, outcome) = {
        let store = app_state.store.lock().await;
        if store.get_chat_session(&id).is_none() {
            return Err(not_found("Session", &id));
        }
        let title = req.title.unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string());
        let mut engine =
            QuizEngine::mount(store.quiz_results().clone(), id.clone(), title, req.questions);
        for (question, option) in &req.answers {
            engine.select_answer(*question, *option);
        }
        let outcome = engine
            .submit()
            .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
        (QuizStateResponse::from_engine(&engine), outcome)
    };

    // --- 2. Relay feedback; its outcome never touches the stored result ---
    match outcome {
        SubmitOutcome::Recorded {
            submission,
            persisted,
            feedback,
        } => {
            let notice = dispatch_feedback(app_state, feedback).await;
            Ok(Json(SubmitQuizResponse {
                state,
                submission: Some(submission),
                persisted,
                notice,
            }))
        }
        SubmitOutcome::AlreadySubmitted => {
            info!("Quiz for session {} already submitted", id);
            Ok(Json(SubmitQuizResponse {
                state,
                submission: None,
                persisted: true,
                notice: None,
            }))
        }
    }
}

/// Runs the relay on its own task so it finishes even if the client goes away,
/// then reports the notice if we are still around to deliver it.
async fn dispatch_feedback(app_state: Arc<AppState>, payload: FeedbackPayload) -> Option<String> {
    let adapter = app_state.feedback_adapter.clone();
    let task = tokio::spawn(async move { relay_feedback(adapter.as_ref(), &payload).await });
    match task.await {
        Ok(notice) => Some(notice.message().to_string()),
        Err(e) => {
            error!("Feedback relay task failed: {}", e);
            None
        }
    }
}
