pub mod images;
pub mod learn;
pub mod protocol;
pub mod quiz;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use images::generate_image_handler;
pub use learn::{ask_handler, learn_handler};
pub use quiz::{
    list_quiz_results_handler, mount_quiz_handler, quiz_summary_handler, submit_quiz_handler,
};
pub use rest::{
    create_session_handler, delete_session_handler, get_current_session_handler,
    get_session_handler, health_handler, list_sessions_handler, set_current_session_handler,
};

/// Builds the API router over the shared state.
pub fn api_router(app_state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/learn", post(learn_handler))
        .route("/api/images", post(generate_image_handler))
        .route(
            "/api/sessions",
            get(list_sessions_handler).post(create_session_handler),
        )
        .route(
            "/api/sessions/current",
            get(get_current_session_handler).put(set_current_session_handler),
        )
        .route(
            "/api/sessions/{id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/api/sessions/{id}/ask", post(ask_handler))
        .route("/api/sessions/{id}/quiz-results", get(list_quiz_results_handler))
        .route("/api/sessions/{id}/quiz-summary", get(quiz_summary_handler))
        .route("/api/sessions/{id}/quiz/mount", post(mount_quiz_handler))
        .route("/api/sessions/{id}/quiz/submit", post(submit_quiz_handler))
        .with_state(app_state)
}
