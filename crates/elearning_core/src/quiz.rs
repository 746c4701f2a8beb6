//! crates/elearning_core/src/quiz.rs
//!
//! The single-attempt quiz workflow.
//!
//! A quiz starts in `Answering` and moves to `Submitted`. Submitting scores every
//! question, appends one [`QuizSubmission`] to the session's history and hands back
//! the feedback payload. From then on the quiz is locked: selections are ignored and
//! further submits are no-ops. Mounting a quiz whose session already holds a
//! submission with the same number of questions starts it locked with the stored
//! answers and score.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{FeedbackPayload, Question, QuizSubmission};
use crate::feedback::build_feedback_payload;
use crate::normalizer::correct_index;
use crate::quiz_results::QuizResultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Selections may be made and changed; not yet submitted.
    Answering,
    /// Scored and persisted; answers are locked.
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("The quiz has no questions")]
    NoQuestions,
    #[error("All questions must be answered before submitting ({answered}/{total} answered)")]
    Incomplete { answered: usize, total: usize },
}

/// What a call to [`QuizEngine::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// First submission: scored, appended to the history, feedback ready to relay.
    Recorded {
        submission: QuizSubmission,
        /// False when the store failed to write; the quiz is locked regardless.
        persisted: bool,
        feedback: FeedbackPayload,
    },
    /// The quiz was already locked; nothing was recorded or emitted.
    AlreadySubmitted,
}

pub struct QuizEngine {
    session_id: String,
    title: String,
    questions: Vec<Question>,
    correct: Vec<Option<usize>>,
    answers: BTreeMap<usize, usize>,
    score: usize,
    submitted: bool,
    restored: bool,
    results: QuizResultStore,
}

impl QuizEngine {
    /// Mounts a quiz for `session_id`, restoring a locked state from the latest
    /// stored submission when its question count matches.
    ///
    /// Only the count is compared, so a different quiz of the same length in the
    /// same session is restored as well.
    pub fn mount(
        results: QuizResultStore,
        session_id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        let session_id = session_id.into();
        let correct = questions.iter().map(correct_index).collect();
        let mut engine = Self {
            session_id,
            title: title.into(),
            questions,
            correct,
            answers: BTreeMap::new(),
            score: 0,
            submitted: false,
            restored: false,
            results,
        };

        if let Some(latest) = engine.results.latest(&engine.session_id) {
            if latest.questions.len() == engine.questions.len() {
                info!(
                    "Restoring submitted quiz for session {} ({}/{})",
                    engine.session_id, latest.score, latest.total_questions
                );
                engine.answers = latest.answers;
                engine.score = latest.score;
                engine.submitted = true;
                engine.restored = true;
            }
        }
        engine
    }

    pub fn phase(&self) -> QuizPhase {
        if self.submitted {
            QuizPhase::Submitted
        } else {
            QuizPhase::Answering
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Whether every question has a selection, i.e. the quiz may be submitted.
    pub fn is_complete(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() == self.questions.len()
    }

    /// Records a selection, replacing any earlier one for that question.
    ///
    /// Ignored once submitted, and for question indices outside the quiz. The option
    /// index is not range-checked.
    pub fn select_answer(&mut self, question_index: usize, option_index: usize) -> bool {
        if self.submitted || question_index >= self.questions.len() {
            return false;
        }
        self.answers.insert(question_index, option_index);
        true
    }

    /// Whether `option_index` is the correct option of `question_index`.
    pub fn is_correct_option(&self, question_index: usize, option_index: usize) -> bool {
        self.correct.get(question_index).copied().flatten() == Some(option_index)
    }

    pub fn submit(&mut self) -> Result<SubmitOutcome, QuizError> {
        if self.submitted {
            return Ok(SubmitOutcome::AlreadySubmitted);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        if !self.is_complete() {
            return Err(QuizError::Incomplete {
                answered: self.answers.len(),
                total: self.questions.len(),
            });
        }

        let correct_answers: BTreeMap<usize, usize> = self
            .correct
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
            .collect();
        let score = self
            .answers
            .iter()
            .filter(|&(i, selected)| correct_answers.get(i) == Some(selected))
            .count();

        self.score = score;
        self.submitted = true;

        let submission = QuizSubmission {
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            correct_answers,
            score,
            total_questions: self.questions.len(),
            timestamp: Utc::now(),
        };
        let persisted = self
            .results
            .save_quiz_results(&self.session_id, submission.clone());
        if !persisted {
            warn!(
                "Quiz result for session {} could not be persisted",
                self.session_id
            );
        }
        info!(
            "Quiz submitted for session {}: {}/{}",
            self.session_id, score, submission.total_questions
        );

        let feedback = build_feedback_payload(&self.title, &self.questions, &self.answers);
        Ok(SubmitOutcome::Recorded {
            submission,
            persisted,
            feedback,
        })
    }

    /// Clears in-memory selections. Only possible before the quiz is submitted.
    pub fn reset(&mut self) -> bool {
        if self.submitted {
            return false;
        }
        self.answers.clear();
        self.score = 0;
        true
    }
}
