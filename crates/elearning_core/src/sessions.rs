//! crates/elearning_core/src/sessions.rs
//!
//! CRUD over chat sessions and the current-session pointer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use tracing::{error, info};

use crate::domain::{ChatSession, Message, QuizSummary, NEW_CHAT_TITLE};
use crate::ports::KeyValueStore;
use crate::quiz_results::QuizResultStore;
use crate::storage::{JsonCollection, CHAT_SESSIONS_KEY, CURRENT_SESSION_KEY};

/// Maximum number of characters of the first user message kept as a title.
pub const TITLE_MAX_CHARS: usize = 40;

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    sessions: JsonCollection<ChatSession>,
    quiz_results: QuizResultStore,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sessions: JsonCollection::new(kv.clone(), CHAT_SESSIONS_KEY),
            quiz_results: QuizResultStore::new(kv.clone()),
            kv,
        }
    }

    /// The quiz history sharing this store's backend.
    pub fn quiz_results(&self) -> &QuizResultStore {
        &self.quiz_results
    }

    /// Writes the session under `session_id`, rewriting its `lastUpdated`.
    pub fn save_chat_session(&self, session_id: &str, mut session: ChatSession) -> bool {
        session.last_updated = Utc::now();
        self.sessions.set(session_id, session)
    }

    pub fn get_all_chat_sessions(&self) -> BTreeMap<String, ChatSession> {
        self.sessions.get_all()
    }

    pub fn get_chat_session(&self, session_id: &str) -> Option<ChatSession> {
        self.sessions.get(session_id)
    }

    /// Removes the session together with its whole quiz history.
    pub fn delete_chat_session(&self, session_id: &str) -> bool {
        if !self.sessions.delete(session_id) {
            return false;
        }
        info!("Deleted chat session {}", session_id);
        self.quiz_results.delete_quiz_results(session_id)
    }

    pub fn get_current_session_id(&self) -> Option<String> {
        match self.kv.get_item(CURRENT_SESSION_KEY) {
            // Older clients stored the id JSON-encoded.
            Ok(Some(raw)) => Some(serde_json::from_str::<String>(&raw).unwrap_or(raw)),
            Ok(None) => None,
            Err(e) => {
                error!("Error getting current session: {}", e);
                None
            }
        }
    }

    pub fn set_current_session_id(&self, session_id: &str) -> bool {
        match self.kv.set_item(CURRENT_SESSION_KEY, session_id) {
            Ok(()) => true,
            Err(e) => {
                error!("Error setting current session: {}", e);
                false
            }
        }
    }

    /// Creates an empty session, stores it and makes it the current one.
    pub fn create_new_session(&self, title: Option<&str>) -> ChatSession {
        let now = Utc::now();
        let session = ChatSession {
            id: generate_session_id(),
            title: title.unwrap_or(NEW_CHAT_TITLE).to_string(),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        };
        self.save_chat_session(&session.id, session.clone());
        self.set_current_session_id(&session.id);
        info!("Created chat session {}", session.id);
        session
    }

    /// All sessions, most recently updated first.
    pub fn get_sorted_sessions(&self) -> Vec<ChatSession> {
        let mut sessions: Vec<ChatSession> = self.get_all_chat_sessions().into_values().collect();
        sessions.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        sessions
    }

    /// Appends a message and retitles a "New Chat" session from its first user message.
    ///
    /// Returns the updated session, or `None` when the session does not exist.
    pub fn append_message(&self, session_id: &str, message: Message) -> Option<ChatSession> {
        let mut session = self.get_chat_session(session_id)?;
        session.messages.push(message);
        if session.title == NEW_CHAT_TITLE {
            if let Some(first) = session.messages.iter().find_map(Message::user_text) {
                session.title = title_from_message(first);
            }
        }
        self.save_chat_session(session_id, session.clone());
        self.get_chat_session(session_id).or(Some(session))
    }

    /// A message id for the session: the current epoch milliseconds, bumped past
    /// the last id so ids stay strictly increasing.
    pub fn next_message_id(&self, session_id: &str) -> i64 {
        let now = Utc::now().timestamp_millis();
        let last = self
            .get_chat_session(session_id)
            .and_then(|s| s.messages.last().map(|m| m.id))
            .unwrap_or(i64::MIN);
        now.max(last.saturating_add(1))
    }

    pub fn get_quiz_summary(&self, session_id: &str) -> Option<QuizSummary> {
        self.quiz_results.summary(session_id)
    }
}

/// `session_<epoch ms>_<9 random base36 chars>`.
fn generate_session_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_lowercase())
        .take(9)
        .collect();
    format!("session_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// The first [`TITLE_MAX_CHARS`] characters of `text`, with an ellipsis if truncated.
pub fn title_from_message(text: &str) -> String {
    if text.chars().count() <= TITLE_MAX_CHARS {
        return text.to_string();
    }
    let prefix: String = text.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, QuizSubmission};
    use crate::storage::tests::BrokenStore;
    use crate::storage::MemoryKeyValueStore;
    use chrono::Duration;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn new_session_becomes_current() {
        let store = store();
        let session = store.create_new_session(None);

        assert_eq!(session.title, NEW_CHAT_TITLE);
        assert!(session.messages.is_empty());
        assert!(session.id.starts_with("session_"));
        assert_eq!(store.get_current_session_id(), Some(session.id.clone()));
        assert_eq!(store.get_chat_session(&session.id).map(|s| s.id), Some(session.id));
    }

    #[test]
    fn session_ids_are_distinct() {
        let store = store();
        let a = store.create_new_session(None);
        let b = store.create_new_session(None);
        assert_ne!(a.id, b.id);
        assert_eq!(store.get_current_session_id(), Some(b.id));
    }

    #[test]
    fn first_user_message_sets_a_truncated_title() {
        let store = store();
        let session = store.create_new_session(None);
        let id = store.next_message_id(&session.id);

        let updated = store
            .append_message(
                &session.id,
                Message::user(id, "Explain quantum computing in depth today please"),
            )
            .unwrap();

        assert_eq!(updated.title, "Explain quantum computing in depth today...");
        assert_eq!(updated.messages.len(), 1);
    }

    #[test]
    fn title_is_only_set_once() {
        let store = store();
        let session = store.create_new_session(None);

        store.append_message(&session.id, Message::user(1, "Rust lifetimes"));
        let updated = store
            .append_message(&session.id, Message::user(2, "Something else"))
            .unwrap();

        assert_eq!(updated.title, "Rust lifetimes");
    }

    #[test]
    fn bot_messages_do_not_set_the_title() {
        let store = store();
        let session = store.create_new_session(None);
        let updated = store
            .append_message(&session.id, Message::bot(1, MessageContent::Text("Hello!".into())))
            .unwrap();
        assert_eq!(updated.title, NEW_CHAT_TITLE);
    }

    #[test]
    fn appending_to_a_missing_session_is_rejected() {
        assert!(store().append_message("nope", Message::user(1, "hi")).is_none());
    }

    #[test]
    fn sessions_are_sorted_most_recent_first() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let store = SessionStore::new(kv.clone());
        let sessions: JsonCollection<ChatSession> = JsonCollection::new(kv, CHAT_SESSIONS_KEY);
        let t1 = Utc::now() - Duration::hours(3);

        for (id, offset) in [("t2", 1), ("t1", 0), ("t3", 2)] {
            let at = t1 + Duration::hours(offset);
            sessions.set(
                id,
                ChatSession {
                    id: id.to_string(),
                    title: id.to_string(),
                    messages: vec![],
                    created_at: at,
                    last_updated: at,
                },
            );
        }

        let ids: Vec<String> = store.get_sorted_sessions().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn deleting_a_session_cascades_to_quiz_results() {
        let store = store();
        let session = store.create_new_session(None);
        store.quiz_results().save_quiz_results(
            &session.id,
            QuizSubmission {
                questions: vec![],
                answers: BTreeMap::new(),
                correct_answers: BTreeMap::new(),
                score: 0,
                total_questions: 0,
                timestamp: Utc::now(),
            },
        );

        assert!(store.delete_chat_session(&session.id));
        assert!(store.get_chat_session(&session.id).is_none());
        assert!(store.quiz_results().get_quiz_results(&session.id).is_empty());
        assert!(store.get_quiz_summary(&session.id).is_none());
    }

    #[test]
    fn message_ids_increase() {
        let store = store();
        let session = store.create_new_session(None);
        let first = store.next_message_id(&session.id);
        store.append_message(&session.id, Message::user(first, "hi"));
        assert!(store.next_message_id(&session.id) > first);
    }

    #[test]
    fn current_session_accepts_json_encoded_ids() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        kv.set_item(CURRENT_SESSION_KEY, "\"session_1_abc\"").unwrap();
        assert_eq!(
            SessionStore::new(kv).get_current_session_id().as_deref(),
            Some("session_1_abc")
        );
    }

    #[test]
    fn broken_storage_never_panics() {
        let store = SessionStore::new(Arc::new(BrokenStore));
        let session = store.create_new_session(Some("Offline"));

        assert_eq!(session.title, "Offline");
        assert!(store.get_sorted_sessions().is_empty());
        assert!(store.get_current_session_id().is_none());
        assert!(!store.delete_chat_session(&session.id));
    }
}
