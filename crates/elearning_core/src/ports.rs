//! crates/elearning_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The stores and the quiz engine depend only on these traits, so the browser-style
//! key-value storage and the third-party pipelines can be swapped for fakes in tests.

use async_trait::async_trait;

use crate::domain::FeedbackPayload;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (storage, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The remote service answered with a non-2xx status.
    #[error("Upstream service returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The request was sent but no response came back.
    #[error("No response from upstream service: {0}")]
    Unavailable(String),
    #[error("Operation timed out: {0}")]
    Timeout(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The HTTP status attached to the failure, if the upstream produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable, synchronous, string-keyed storage (the browser `localStorage` contract).
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> PortResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove_item(&self, key: &str) -> PortResult<()>;
}

#[async_trait]
pub trait LearningContentService: Send + Sync {
    /// Sends a topic (or follow-up prompt) to the content pipeline and returns
    /// the structured learning material it produced.
    async fn request_learning(&self, user_input: &str) -> PortResult<serde_json::Value>;
}

#[async_trait]
pub trait QuizFeedbackService: Send + Sync {
    /// Delivers graded quiz responses to the external learning-improvement endpoint.
    async fn send_quiz_feedback(&self, payload: &FeedbackPayload) -> PortResult<()>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generates an illustration for the prompt and returns its URL.
    async fn generate_image(&self, prompt: &str) -> PortResult<String>;
}
