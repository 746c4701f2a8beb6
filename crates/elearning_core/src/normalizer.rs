//! crates/elearning_core/src/normalizer.rs
//!
//! Reconciles the three historical question schemas into one canonical
//! correct-answer index.
//!
//! | shape | field            | example          |
//! |-------|------------------|------------------|
//! | A     | `answer`         | `"B"`, `"B) 42"` |
//! | B     | `correctAnswer`  | `1`              |
//! | C     | `correct_answer` | `1`              |
//!
//! When several fields are present the first shape in the table wins. A question
//! with none of them is not gradable and every selection counts as incorrect.

use serde_json::Value;

use crate::domain::Question;

/// The correct-answer field a question was published with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    /// Shape A: a letter, possibly surrounded by other characters.
    Letter(String),
    /// Shape B: `correctAnswer`, a 0-based index.
    Index(i64),
    /// Shape C: `correct_answer`, a 0-based index.
    AltIndex(i64),
    /// Shape B present but not an integer (`null`, a string, ...). Kept verbatim and
    /// never matches any option.
    Malformed(Value),
}

impl AnswerKey {
    /// Picks the answer key from the raw fields using shape precedence A, B, C.
    ///
    /// A field takes part once its key is present. An empty or non-string `answer`
    /// falls through to shape B. A present `correctAnswer` always wins over shape C,
    /// even when its value is unusable.
    pub fn from_fields(
        answer: Option<&Value>,
        correct_answer: Option<&Value>,
        alt_correct_answer: Option<&Value>,
    ) -> Option<Self> {
        if let Some(letter) = answer.and_then(Value::as_str).filter(|s| !s.is_empty()) {
            return Some(AnswerKey::Letter(letter.to_string()));
        }
        if let Some(value) = correct_answer {
            return Some(match value.as_i64() {
                Some(index) => AnswerKey::Index(index),
                None => AnswerKey::Malformed(value.clone()),
            });
        }
        alt_correct_answer
            .and_then(Value::as_i64)
            .map(AnswerKey::AltIndex)
    }

    /// The 0-based option index this key designates, if it designates one.
    pub fn index(&self) -> Option<usize> {
        match self {
            AnswerKey::Letter(raw) => letter_index(raw),
            AnswerKey::Index(index) | AnswerKey::AltIndex(index) => usize::try_from(*index).ok(),
            AnswerKey::Malformed(_) => None,
        }
    }
}

/// Keeps only `A`..=`D` (uppercase) and maps the first survivor to its offset from `A`.
fn letter_index(raw: &str) -> Option<usize> {
    raw.chars()
        .find(|c| ('A'..='D').contains(c))
        .map(|c| c as usize - 'A' as usize)
}

/// Canonical correct index for a question, or `None` when it cannot be graded.
pub fn correct_index(question: &Question) -> Option<usize> {
    question.answer_key.as_ref().and_then(AnswerKey::index)
}

/// Whether selecting `selected` answers the question correctly.
pub fn is_correct(question: &Question, selected: usize) -> bool {
    correct_index(question) == Some(selected)
}

/// The option letter for a 0-based index (`0` -> `"A"`). Empty when no letter exists.
pub fn option_letter(index: usize) -> String {
    u32::try_from(index)
        .ok()
        .and_then(|offset| char::from_u32('A' as u32 + offset))
        .map(String::from)
        .unwrap_or_default()
}

/// [`option_letter`] for an optional index; `None` maps to an empty string.
pub fn answer_letter(index: Option<usize>) -> String {
    index.map(option_letter).unwrap_or_default()
}
