//! services/api/src/web/protocol.rs
//!
//! Request and response payloads exchanged between the browser client and the API.
//! Field names are camelCase to match the client's existing data contracts.

use std::collections::BTreeMap;

use elearning_core::domain::{Question, QuizSubmission, QuizSummary};
use elearning_core::quiz::{QuizEngine, QuizPhase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

//=========================================================================================
// Content Requests
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearnRequest {
    #[serde(default)]
    pub user_input: String,
    /// When present, the request is turned into a "continue learning" prompt.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub quiz_summary: Option<QuizSummary>,
}

#[derive(Serialize, ToSchema)]
pub struct LearnResponse {
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub prompt: String,
    #[serde(default)]
    pub include_quiz_results: bool,
}

//=========================================================================================
// Sessions
//=========================================================================================

#[derive(Deserialize, Default, ToSchema)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSessionPayload {
    pub session_id: Option<String>,
}

//=========================================================================================
// Quizzes
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MountQuizRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
    /// Question index -> selected option index.
    #[schema(value_type = Object)]
    pub answers: BTreeMap<usize, usize>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhaseDto {
    Answering,
    Submitted,
}

impl From<QuizPhase> for QuizPhaseDto {
    fn from(phase: QuizPhase) -> Self {
        match phase {
            QuizPhase::Answering => QuizPhaseDto::Answering,
            QuizPhase::Submitted => QuizPhaseDto::Submitted,
        }
    }
}

/// The engine's state as seen by the client.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizStateResponse {
    pub phase: QuizPhaseDto,
    pub restored: bool,
    #[schema(value_type = Object)]
    pub answers: BTreeMap<usize, usize>,
    pub score: usize,
    pub total_questions: usize,
    /// Per question, the option index to highlight as correct once submitted.
    pub correct_options: Vec<Option<usize>>,
}

impl QuizStateResponse {
    pub fn from_engine(engine: &QuizEngine) -> Self {
        let phase = QuizPhaseDto::from(engine.phase());
        let correct_options = engine
            .questions()
            .iter()
            .enumerate()
            .map(|(q, question)| {
                if phase != QuizPhaseDto::Submitted {
                    return None;
                }
                (0..question.options.len()).find(|o| engine.is_correct_option(q, *o))
            })
            .collect();
        Self {
            phase,
            restored: engine.is_restored(),
            answers: engine.answers().clone(),
            score: engine.score(),
            total_questions: engine.questions().len(),
            correct_options,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub state: QuizStateResponse,
    /// The stored submission; absent when the quiz was already locked.
    #[schema(value_type = Option<Object>)]
    pub submission: Option<QuizSubmission>,
    pub persisted: bool,
    /// Transient notice describing the feedback relay outcome.
    pub notice: Option<String>,
}

//=========================================================================================
// Images
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ImageRequest {
    pub prompt: String,
}

#[derive(Serialize, ToSchema)]
pub struct ImageResponse {
    /// `null` when generation is disabled, failed or timed out.
    pub url: Option<String>,
}
