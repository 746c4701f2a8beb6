//! crates/elearning_core/src/quiz_results.rs
//!
//! Append-only quiz submission history, keyed by session id.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::domain::{QuizSubmission, QuizSummary, SummaryItem};
use crate::ports::KeyValueStore;
use crate::storage::{JsonCollection, QUIZ_RESULTS_KEY};

#[derive(Clone)]
pub struct QuizResultStore {
    results: JsonCollection<Vec<QuizSubmission>>,
}

impl QuizResultStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            results: JsonCollection::new(kv, QUIZ_RESULTS_KEY),
        }
    }

    /// Appends a submission to the session's history, stamping it with the current time.
    pub fn save_quiz_results(&self, session_id: &str, mut submission: QuizSubmission) -> bool {
        submission.timestamp = Utc::now();
        debug!(
            "Saving quiz result for {}: {}/{}",
            session_id, submission.score, submission.total_questions
        );
        self.results
            .update(session_id, |history| history.push(submission))
    }

    pub fn get_all_quiz_results(&self) -> BTreeMap<String, Vec<QuizSubmission>> {
        self.results.get_all()
    }

    /// The session's submissions in chronological order; empty when there are none.
    pub fn get_quiz_results(&self, session_id: &str) -> Vec<QuizSubmission> {
        self.results.get(session_id).unwrap_or_default()
    }

    pub fn latest(&self, session_id: &str) -> Option<QuizSubmission> {
        self.get_quiz_results(session_id).pop()
    }

    pub fn delete_quiz_results(&self, session_id: &str) -> bool {
        self.results.delete(session_id)
    }

    /// Derives the pass/fail breakdown of the session's latest submission.
    pub fn summary(&self, session_id: &str) -> Option<QuizSummary> {
        self.latest(session_id).map(|latest| summarize(&latest))
    }
}

/// Splits a submission into passed and failed questions.
///
/// Answer texts fall back to the raw index when the option cannot be resolved.
pub fn summarize(submission: &QuizSubmission) -> QuizSummary {
    let mut passed = Vec::new();
    let mut failed = Vec::new();

    for (index, question) in submission.questions.iter().enumerate() {
        let user_answer = submission.answers.get(&index).copied();
        let correct_answer = submission.correct_answers.get(&index).copied();
        let item = SummaryItem {
            index: index + 1,
            question: question.text.clone(),
            user_answer: None,
            correct_answer: None,
        };

        if user_answer.is_some() && user_answer == correct_answer {
            passed.push(item);
        } else {
            let describe = |answer: Option<usize>| {
                answer.map(|i| {
                    question
                        .option_text(i)
                        .map(str::to_string)
                        .unwrap_or_else(|| i.to_string())
                })
            };
            failed.push(SummaryItem {
                user_answer: describe(user_answer),
                correct_answer: describe(correct_answer),
                ..item
            });
        }
    }

    QuizSummary {
        total_questions: submission.questions.len(),
        score: submission.score,
        passed,
        failed,
        timestamp: submission.timestamp,
    }
}
