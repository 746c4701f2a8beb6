//! crates/elearning_core/src/feedback.rs
//!
//! Best-effort relay of graded quiz answers to the external feedback endpoint,
//! and the failure taxonomy shared with content requests.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::domain::{FeedbackPayload, FeedbackResponse, Question};
use crate::normalizer::{answer_letter, correct_index, option_letter};
use crate::ports::{PortError, QuizFeedbackService};

/// Builds the feedback payload for a submitted quiz. Letters are empty where no
/// selection or no determinable correct answer exists.
pub fn build_feedback_payload(
    title: &str,
    questions: &[Question],
    answers: &BTreeMap<usize, usize>,
) -> FeedbackPayload {
    let responses = questions
        .iter()
        .enumerate()
        .map(|(index, question)| FeedbackResponse {
            topic: question.topic.clone().unwrap_or_else(|| title.to_string()),
            question: question.text.clone(),
            options: question
                .options
                .iter()
                .enumerate()
                .map(|(i, option)| (option_letter(i), option.text().to_string()))
                .collect(),
            correct_answer: answer_letter(correct_index(question)),
            user_response: answer_letter(answers.get(&index).copied()),
        })
        .collect();

    FeedbackPayload {
        title: title.to_string(),
        responses,
    }
}

//=========================================================================================
// Failure Categories
//=========================================================================================

/// Markers some upstream gateways put in the body instead of a 402 status.
const PAYMENT_MARKERS: [&str; 3] = [
    "payment required",
    "insufficient credits",
    "credits exhausted",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    CreditsExhausted,
    Unauthorized,
    Server,
    Generic,
}

impl FailureCategory {
    pub fn classify(error: &PortError) -> Self {
        match error {
            PortError::Upstream { status, body } => {
                let body = body.to_lowercase();
                if *status == 402 || PAYMENT_MARKERS.iter().any(|m| body.contains(m)) {
                    FailureCategory::CreditsExhausted
                } else if *status == 401 || *status == 403 {
                    FailureCategory::Unauthorized
                } else if *status >= 500 {
                    FailureCategory::Server
                } else {
                    FailureCategory::Generic
                }
            }
            PortError::Unavailable(_) | PortError::Timeout(_) => FailureCategory::Server,
            _ => FailureCategory::Generic,
        }
    }

    /// Short, transient notice shown after a failed feedback relay.
    pub fn feedback_notice(self) -> &'static str {
        match self {
            FailureCategory::CreditsExhausted => {
                "Your results are saved, but feedback could not be sent: the learning service is out of credits."
            }
            FailureCategory::Unauthorized => {
                "Your results are saved, but feedback could not be sent: the learning service rejected our credentials."
            }
            FailureCategory::Server => {
                "Your results are saved, but the learning service is having trouble. Feedback was not sent."
            }
            FailureCategory::Generic => "Your results are saved, but feedback could not be sent.",
        }
    }
}

/// Result of a relay attempt, for choosing a user-facing notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackNotice {
    Sent,
    Failed(FailureCategory),
}

impl FeedbackNotice {
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackNotice::Sent => {
                "Thanks! Your quiz results were shared to improve future lessons."
            }
            FeedbackNotice::Failed(category) => category.feedback_notice(),
        }
    }
}

/// Sends the payload once. Failures are categorized and logged, never retried.
pub async fn relay_feedback(
    service: &dyn QuizFeedbackService,
    payload: &FeedbackPayload,
) -> FeedbackNotice {
    match service.send_quiz_feedback(payload).await {
        Ok(()) => {
            info!(
                "Quiz feedback sent for '{}' ({} responses)",
                payload.title,
                payload.responses.len()
            );
            FeedbackNotice::Sent
        }
        Err(e) => {
            let category = FailureCategory::classify(&e);
            warn!("Quiz feedback failed ({:?}): {}", category, e);
            FeedbackNotice::Failed(category)
        }
    }
}
