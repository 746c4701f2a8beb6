use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use api_lib::config::Config;
use api_lib::web::{
    ask_handler, create_session_handler, delete_session_handler, generate_image_handler,
    get_session_handler, learn_handler, list_quiz_results_handler, mount_quiz_handler,
    protocol::{AskRequest, ImageRequest, LearnRequest, MountQuizRequest, SubmitQuizRequest},
    quiz_summary_handler,
    state::AppState,
    submit_quiz_handler,
};
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use elearning_core::{
    domain::{FeedbackPayload, Question},
    ports::{LearningContentService, PortError, PortResult, QuizFeedbackService},
    MemoryKeyValueStore,
};
use serde_json::{json, Value};

//=========================================================================================
// Fakes
//=========================================================================================

struct FakeContent {
    reply: PortResult<Value>,
    inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl LearningContentService for FakeContent {
    async fn request_learning(&self, user_input: &str) -> PortResult<Value> {
        self.inputs.lock().unwrap().push(user_input.to_string());
        self.reply.clone()
    }
}

#[derive(Default)]
struct CountingFeedback {
    calls: AtomicUsize,
    fail_with: Option<PortError>,
}

#[async_trait]
impl QuizFeedbackService for CountingFeedback {
    async fn send_quiz_feedback(&self, _payload: &FeedbackPayload) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

struct Harness {
    state: Arc<AppState>,
    content: Arc<FakeContent>,
    feedback: Arc<CountingFeedback>,
}

fn harness_with(reply: PortResult<Value>, feedback: CountingFeedback) -> Harness {
    let config = Config::from_lookup(|name: &str| match name {
        "AIRIA_API_URL" => Some("http://localhost:9/pipeline".to_string()),
        "AIRIA_API_KEY" => Some("test-key".to_string()),
        _ => None,
    })
    .unwrap();
    let content = Arc::new(FakeContent {
        reply,
        inputs: Mutex::new(Vec::new()),
    });
    let feedback = Arc::new(feedback);
    let state = Arc::new(AppState::new(
        Arc::new(config),
        Arc::new(MemoryKeyValueStore::new()),
        content.clone(),
        feedback.clone(),
        None,
    ));
    Harness {
        state,
        content,
        feedback,
    }
}

fn harness() -> Harness {
    harness_with(
        Ok(json!({"title": "Rust", "quiz": {"questions": []}})),
        CountingFeedback::default(),
    )
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn new_session(h: &Harness) -> String {
    let response = create_session_handler(State(h.state.clone()), None)
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

fn quiz_questions() -> Vec<Question> {
    serde_json::from_value(json!([
        {"question": "Q1", "options": ["x", "y", "z"], "answer": "B"},
        {"question": "Q2", "options": ["p", "q", "r"], "correctAnswer": 2}
    ]))
    .unwrap()
}

fn submit_request(answers: Value) -> SubmitQuizRequest {
    SubmitQuizRequest {
        title: Some("Rust basics".to_string()),
        questions: quiz_questions(),
        answers: serde_json::from_value(answers).unwrap(),
    }
}

async fn submit(h: &Harness, id: &str, answers: Value) -> Response {
    submit_quiz_handler(
        State(h.state.clone()),
        Path(id.to_string()),
        Json(submit_request(answers)),
    )
    .await
    .into_response()
}

//=========================================================================================
// Quiz Flow
//=========================================================================================

#[tokio::test]
async fn submitting_scores_persists_and_relays_once() {
    let h = harness();
    let id = new_session(&h).await;

    let response = submit(&h, &id, json!({"0": 1, "1": 0})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["score"], json!(1));
    assert_eq!(body["submission"]["totalQuestions"], json!(2));
    assert_eq!(body["submission"]["correctAnswers"], json!({"0": 1, "1": 2}));
    assert_eq!(body["state"]["phase"], json!("submitted"));
    assert_eq!(body["state"]["correctOptions"], json!([1, 2]));
    assert!(body["notice"].is_string());

    let again = body_json(submit(&h, &id, json!({"0": 1, "1": 2})).await).await;
    assert!(again["submission"].is_null());
    assert_eq!(again["state"]["score"], json!(1));
    assert_eq!(again["state"]["restored"], json!(true));

    assert_eq!(h.feedback.calls.load(Ordering::SeqCst), 1);
    let history = list_quiz_results_handler(State(h.state.clone()), Path(id.clone()))
        .await
        .into_response();
    assert_eq!(body_json(history).await.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn incomplete_submissions_are_rejected() {
    let h = harness();
    let id = new_session(&h).await;

    let response = submit(&h, &id, json!({"0": 1})).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.feedback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quizzes_for_unknown_sessions_are_not_found() {
    let h = harness();
    let response = submit(&h, "session_missing", json!({"0": 1, "1": 2})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_failure_keeps_the_stored_result() {
    let h = harness_with(
        Ok(json!({})),
        CountingFeedback {
            calls: AtomicUsize::new(0),
            fail_with: Some(PortError::Upstream {
                status: 503,
                body: "down".to_string(),
            }),
        },
    );
    let id = new_session(&h).await;

    let body = body_json(submit(&h, &id, json!({"0": 1, "1": 2})).await).await;
    assert_eq!(body["persisted"], json!(true));
    assert!(body["notice"].as_str().unwrap().contains("having trouble"));

    let summary = quiz_summary_handler(State(h.state.clone()), Path(id))
        .await
        .into_response();
    assert_eq!(body_json(summary).await["score"], json!(2));
}

#[tokio::test]
async fn mounting_restores_only_same_length_quizzes() {
    let h = harness();
    let id = new_session(&h).await;
    submit(&h, &id, json!({"0": 1, "1": 0})).await;

    let same = mount_quiz_handler(
        State(h.state.clone()),
        Path(id.clone()),
        Json(MountQuizRequest {
            title: None,
            questions: quiz_questions(),
        }),
    )
    .await
    .into_response();
    let same = body_json(same).await;
    assert_eq!(same["phase"], json!("submitted"));
    assert_eq!(same["answers"], json!({"0": 1, "1": 0}));
    assert_eq!(same["score"], json!(1));

    let shorter = mount_quiz_handler(
        State(h.state.clone()),
        Path(id),
        Json(MountQuizRequest {
            title: None,
            questions: quiz_questions().into_iter().take(1).collect(),
        }),
    )
    .await
    .into_response();
    let shorter = body_json(shorter).await;
    assert_eq!(shorter["phase"], json!("answering"));
    assert_eq!(shorter["answers"], json!({}));
    assert_eq!(shorter["restored"], json!(false));
}

//=========================================================================================
// Sessions
//=========================================================================================

#[tokio::test]
async fn deleting_a_session_removes_its_quiz_history() {
    let h = harness();
    let id = new_session(&h).await;
    submit(&h, &id, json!({"0": 1, "1": 2})).await;

    let deleted = delete_session_handler(State(h.state.clone()), Path(id.clone()))
        .await
        .into_response();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let fetched = get_session_handler(State(h.state.clone()), Path(id.clone()))
        .await
        .into_response();
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);

    let history = list_quiz_results_handler(State(h.state.clone()), Path(id))
        .await
        .into_response();
    assert_eq!(body_json(history).await, json!([]));
}

#[tokio::test]
async fn asking_records_both_sides_and_titles_the_session() {
    let h = harness();
    let id = new_session(&h).await;

    let response = ask_handler(
        State(h.state.clone()),
        Path(id.clone()),
        Json(AskRequest {
            prompt: "Explain quantum computing in depth today please".to_string(),
            include_quiz_results: false,
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let session = body_json(response).await;
    assert_eq!(session["title"], json!("Explain quantum computing in depth today..."));
    let messages = session["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["type"], json!("user"));
    assert_eq!(messages[1]["type"], json!("bot"));
    assert_eq!(messages[1]["content"]["title"], json!("Rust"));
    assert!(messages[1]["id"].as_i64() > messages[0]["id"].as_i64());
}

#[tokio::test]
async fn upstream_failures_become_bot_error_messages() {
    let h = harness_with(
        Err(PortError::Upstream {
            status: 402,
            body: "{\"message\":\"Payment Required\"}".to_string(),
        }),
        CountingFeedback::default(),
    );
    let id = new_session(&h).await;

    let response = ask_handler(
        State(h.state.clone()),
        Path(id),
        Json(AskRequest {
            prompt: "Rust".to_string(),
            include_quiz_results: false,
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let session = body_json(response).await;
    let reply = &session["messages"][1]["content"];
    assert_eq!(reply["error"], json!(true));
    assert!(reply["message"].as_str().unwrap().contains("out of credits"));
    assert_eq!(reply["details"]["status"], json!(402));
}

#[tokio::test]
async fn follow_ups_can_carry_the_quiz_summary() {
    let h = harness();
    let id = new_session(&h).await;
    submit(&h, &id, json!({"0": 1, "1": 0})).await;

    ask_handler(
        State(h.state.clone()),
        Path(id),
        Json(AskRequest {
            prompt: "Keep going".to_string(),
            include_quiz_results: true,
        }),
    )
    .await
    .into_response();

    let inputs = h.content.inputs.lock().unwrap();
    let sent = inputs.last().unwrap();
    assert!(sent.starts_with("Keep going"));
    assert!(sent.contains("1/2 correct"));
    assert!(sent.contains("(I answered: p; correct: r)"));
}

//=========================================================================================
// Proxy and Images
//=========================================================================================

#[tokio::test]
async fn learn_proxies_data_and_upstream_errors() {
    let h = harness();
    let ok = learn_handler(
        State(h.state.clone()),
        Json(LearnRequest {
            user_input: "Rust".to_string(),
            quiz_summary: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await["data"]["title"], json!("Rust"));

    let blank = learn_handler(
        State(h.state.clone()),
        Json(LearnRequest {
            user_input: "  ".to_string(),
            quiz_summary: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let denied = harness_with(
        Err(PortError::Upstream {
            status: 401,
            body: "{\"detail\":\"bad key\"}".to_string(),
        }),
        CountingFeedback::default(),
    );
    let response = learn_handler(
        State(denied.state.clone()),
        Json(LearnRequest {
            user_input: "Rust".to_string(),
            quiz_summary: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Airia API Error"));
    assert_eq!(body["details"]["detail"], json!("bad key"));
}

#[tokio::test]
async fn learn_reports_unreachable_pipeline_as_503() {
    let h = harness_with(
        Err(PortError::Unavailable("connection refused".to_string())),
        CountingFeedback::default(),
    );
    let response = learn_handler(
        State(h.state.clone()),
        Json(LearnRequest {
            user_input: "Rust".to_string(),
            quiz_summary: None,
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], json!("No response from Airia"));
}

#[tokio::test]
async fn images_degrade_to_null_without_a_generator() {
    let h = harness();
    let response = generate_image_handler(
        State(h.state.clone()),
        Json(ImageRequest {
            prompt: "A lighthouse at dusk".to_string(),
        }),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"url": null}));
}
