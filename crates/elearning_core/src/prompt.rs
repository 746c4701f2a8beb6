//! crates/elearning_core/src/prompt.rs
//!
//! Text sent to, and shown about, the content pipeline.

use std::fmt::Write;

use crate::domain::QuizSummary;
use crate::feedback::FailureCategory;
use crate::ports::PortError;

/// Builds a "continue learning" request that tells the pipeline how the learner
/// did on the last quiz, so the next lesson can revisit what was missed.
pub fn continue_learning_prompt(query: &str, summary: &QuizSummary) -> String {
    let mut prompt = String::from(query.trim());
    let _ = write!(
        prompt,
        "\n\nMy latest quiz result: {}/{} correct.",
        summary.score, summary.total_questions
    );

    if !summary.passed.is_empty() {
        prompt.push_str("\nI answered these correctly:");
        for item in &summary.passed {
            let _ = write!(prompt, "\n- Q{}: {}", item.index, item.question);
        }
    }

    if !summary.failed.is_empty() {
        prompt.push_str("\nI got these wrong:");
        for item in &summary.failed {
            let _ = write!(prompt, "\n- Q{}: {}", item.index, item.question);
            if let Some(answer) = &item.user_answer {
                let _ = write!(prompt, " (I answered: {}", answer);
                match &item.correct_answer {
                    Some(correct) => {
                        let _ = write!(prompt, "; correct: {})", correct);
                    }
                    None => prompt.push(')'),
                }
            }
        }
        prompt.push_str(
            "\nPlease focus on the topics I got wrong and build on what I already know.",
        );
    } else {
        prompt.push_str("\nI got everything right, so please take me a step further.");
    }

    prompt
}

/// Bot-authored message shown in the transcript when a content request fails.
pub fn content_error_message(error: &PortError) -> String {
    match FailureCategory::classify(error) {
        FailureCategory::CreditsExhausted => {
            "The learning service has run out of credits, so I can't generate new content right now. Please try again later."
                .to_string()
        }
        FailureCategory::Unauthorized => {
            "The learning service rejected our credentials. Please check the API key configuration."
                .to_string()
        }
        FailureCategory::Server => {
            "The learning service is having trouble right now. Please try again in a few minutes."
                .to_string()
        }
        FailureCategory::Generic => {
            "I apologize, but I encountered an error while processing your request. Please try again."
                .to_string()
        }
    }
}
