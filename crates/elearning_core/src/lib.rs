pub mod domain;
pub mod feedback;
pub mod normalizer;
pub mod ports;
pub mod prompt;
pub mod quiz;
pub mod quiz_results;
pub mod sessions;
pub mod storage;

pub use domain::{
    ChatSession, ErrorContent, FeedbackPayload, FeedbackResponse, Message, MessageContent,
    MessageKind, Question, QuizOption, QuizSubmission, QuizSummary, StructuredContent, SummaryItem,
};
pub use feedback::{relay_feedback, FailureCategory, FeedbackNotice};
pub use normalizer::{correct_index, is_correct, AnswerKey};
pub use ports::{
    ImageGenerationService, KeyValueStore, LearningContentService, PortError, PortResult,
    QuizFeedbackService,
};
pub use quiz::{QuizEngine, QuizError, QuizPhase, SubmitOutcome};
pub use quiz_results::QuizResultStore;
pub use sessions::SessionStore;
pub use storage::{JsonCollection, MemoryKeyValueStore};
