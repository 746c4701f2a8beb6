//! crates/elearning_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Field names follow the persisted browser-storage layout (camelCase), so these
//! types serialize directly into the key-value store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::normalizer::AnswerKey;

/// Title given to every session until its first user message arrives.
pub const NEW_CHAT_TITLE: &str = "New Chat";

//=========================================================================================
// Chat Sessions
//=========================================================================================

/// One continuous chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Bot,
}

/// A single transcript entry. Never mutated once appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_quiz_results: Option<bool>,
}

impl Message {
    pub fn user(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            kind: MessageKind::User,
            content: MessageContent::Text(text.into()),
            timestamp: Utc::now(),
            original_prompt: None,
            include_quiz_results: None,
        }
    }

    pub fn bot(id: i64, content: MessageContent) -> Self {
        Self {
            id,
            kind: MessageKind::Bot,
            content,
            timestamp: Utc::now(),
            original_prompt: None,
            include_quiz_results: None,
        }
    }

    /// The plain text of a user message, if this is one.
    pub fn user_text(&self) -> Option<&str> {
        match (&self.kind, &self.content) {
            (MessageKind::User, MessageContent::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Message body: plain text, a bot-authored error, or generated learning material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Error(ErrorContent),
    Structured(StructuredContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Learning material returned by the content pipeline. Only the quiz is
/// interpreted here; everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visualizations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredContent {
    /// The quiz questions, read from `quiz.questions` or from `quiz` itself
    /// when the pipeline returned a bare array.
    pub fn quiz_questions(&self) -> Vec<Question> {
        let raw = match &self.quiz {
            Some(Value::Object(quiz)) => quiz.get("questions").cloned(),
            Some(array @ Value::Array(_)) => Some(array.clone()),
            _ => None,
        };
        match raw {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Ignoring malformed quiz questions: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn quiz_title(&self) -> Option<&str> {
        self.quiz
            .as_ref()
            .and_then(|quiz| quiz.get("title"))
            .and_then(Value::as_str)
    }
}

//=========================================================================================
// Quiz Questions
//=========================================================================================

/// An answer option: either a bare string or an object carrying `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizOption {
    Plain(String),
    Rich {
        text: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl QuizOption {
    pub fn text(&self) -> &str {
        match self {
            QuizOption::Plain(text) => text,
            QuizOption::Rich { text, .. } => text,
        }
    }
}

impl From<&str> for QuizOption {
    fn from(text: &str) -> Self {
        QuizOption::Plain(text.to_string())
    }
}

/// A multiple-choice question with its answer key resolved at ingestion.
///
/// Serialized back in the same schema shape it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawQuestion", into = "RawQuestion")]
pub struct Question {
    pub text: String,
    pub options: Vec<QuizOption>,
    pub explanation: Option<String>,
    pub topic: Option<String>,
    pub answer_key: Option<AnswerKey>,
    pub extra: Map<String, Value>,
}

impl Question {
    pub fn new(text: impl Into<String>, options: &[&str], answer_key: Option<AnswerKey>) -> Self {
        Self {
            text: text.into(),
            options: options.iter().map(|o| QuizOption::from(*o)).collect(),
            explanation: None,
            topic: None,
            answer_key,
            extra: Map::new(),
        }
    }

    /// Option text at `index`, if the index is in range.
    pub fn option_text(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(QuizOption::text)
    }
}

/// The question record as it appears on the wire, in any of the known shapes.
#[derive(Serialize, Deserialize)]
struct RawQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<Vec<QuizOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<QuizOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    answer: Option<Value>,
    #[serde(
        default,
        rename = "correctAnswer",
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    correct_answer_camel: Option<Value>,
    #[serde(default, rename = "correct_answer", skip_serializing_if = "Option::is_none")]
    correct_answer_snake: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// `Some` whenever the key is present, including an explicit `null`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<RawQuestion> for Question {
    fn from(raw: RawQuestion) -> Self {
        let answer_key = AnswerKey::from_fields(
            raw.answer.as_ref(),
            raw.correct_answer_camel.as_ref(),
            raw.correct_answer_snake.as_ref(),
        );
        Self {
            text: non_empty(raw.question).or(raw.text).unwrap_or_default(),
            options: raw.options.or(raw.choices).unwrap_or_default(),
            explanation: non_empty(raw.explanation).or(raw.rationale),
            topic: raw.topic,
            answer_key,
            extra: raw.extra,
        }
    }
}

impl From<Question> for RawQuestion {
    fn from(question: Question) -> Self {
        let (answer, correct_answer_camel, correct_answer_snake) = match question.answer_key {
            Some(AnswerKey::Letter(letter)) => (Some(Value::String(letter)), None, None),
            Some(AnswerKey::Index(index)) => (None, Some(Value::from(index)), None),
            Some(AnswerKey::AltIndex(index)) => (None, None, Some(Value::from(index))),
            Some(AnswerKey::Malformed(value)) => (None, Some(value), None),
            None => (None, None, None),
        };
        Self {
            question: Some(question.text),
            text: None,
            options: Some(question.options),
            choices: None,
            explanation: question.explanation,
            rationale: None,
            topic: question.topic,
            answer,
            correct_answer_camel,
            correct_answer_snake,
            extra: question.extra,
        }
    }
}

//=========================================================================================
// Quiz Submissions and Summaries
//=========================================================================================

/// One completed, scored and locked attempt at a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    pub questions: Vec<Question>,
    pub answers: BTreeMap<usize, usize>,
    #[serde(default)]
    pub correct_answers: BTreeMap<usize, usize>,
    pub score: usize,
    pub total_questions: usize,
    pub timestamp: DateTime<Utc>,
}

/// A question entry in a [`QuizSummary`]. Answer texts are only set for failed questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryItem {
    /// 1-based position in the quiz.
    pub index: usize,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Pass/fail breakdown of the latest submission for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub total_questions: usize,
    pub score: usize,
    pub passed: Vec<SummaryItem>,
    pub failed: Vec<SummaryItem>,
    pub timestamp: DateTime<Utc>,
}

//=========================================================================================
// Feedback Relay Payloads
//=========================================================================================

/// One graded answer as sent to the feedback endpoint. Letters are `A` + index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub topic: String,
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub correct_answer: String,
    pub user_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    pub title: String,
    pub responses: Vec<FeedbackResponse>,
}
