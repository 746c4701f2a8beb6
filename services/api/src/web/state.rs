//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use elearning_core::ports::{
    ImageGenerationService, KeyValueStore, LearningContentService, QuizFeedbackService,
};
use elearning_core::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Store calls are read-modify-write over whole collections, so they are
    /// serialized behind one lock.
    pub store: Arc<Mutex<SessionStore>>,
    pub content_adapter: Arc<dyn LearningContentService>,
    pub feedback_adapter: Arc<dyn QuizFeedbackService>,
    /// Absent when no image API key is configured.
    pub image_adapter: Option<Arc<dyn ImageGenerationService>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        kv: Arc<dyn KeyValueStore>,
        content_adapter: Arc<dyn LearningContentService>,
        feedback_adapter: Arc<dyn QuizFeedbackService>,
        image_adapter: Option<Arc<dyn ImageGenerationService>>,
    ) -> Self {
        Self {
            config,
            store: Arc::new(Mutex::new(SessionStore::new(kv))),
            content_adapter,
            feedback_adapter,
            image_adapter,
        }
    }
}
