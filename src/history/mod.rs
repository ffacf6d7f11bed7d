//! Per-user persisted conversations.
//!
//! Each user owns one bounded collection behind the [`KeyValueStore`]
//! boundary: newest first, capped at [`MAX_HISTORIES`], eviction from the
//! tail. The cap is global for the user, not per role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::message::Message;
use crate::core::role::ExpertiseRole;
use crate::storage::{get_json, set_json, KeyValueStore, StorageError};
use crate::utils::id::unique_id;

pub const MAX_HISTORIES: usize = 10;

const TITLE_PREFIX_CHARS: usize = 30;

/// A saved snapshot of one conversation, tied to one user and one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub role: ExpertiseRole,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

pub struct ChatHistoryStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ChatHistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a new conversation at the head of the user's collection,
    /// evicting the oldest entries beyond the cap. Without an explicit
    /// title the first user message provides one.
    pub fn save(
        &self,
        user_id: &str,
        title: Option<&str>,
        messages: &[Message],
        role: ExpertiseRole,
    ) -> Result<ChatHistory, StorageError> {
        let now = Utc::now();
        let history = ChatHistory {
            id: unique_id("chat"),
            title: title
                .map(str::to_string)
                .unwrap_or_else(|| auto_title(messages)),
            messages: messages.to_vec(),
            role,
            created_at: now,
            last_updated: now,
        };

        let mut histories = self.list(user_id);
        histories.insert(0, history.clone());
        histories.truncate(MAX_HISTORIES);
        set_json(&self.store, &key_for(user_id), &histories)?;
        debug!(user_id, chat_id = %history.id, "saved conversation");
        Ok(history)
    }

    /// All saved conversations for a user, newest first. A missing or
    /// unreadable collection reads as empty.
    pub fn list(&self, user_id: &str) -> Vec<ChatHistory> {
        get_json(&self.store, &key_for(user_id)).unwrap_or_default()
    }

    pub fn get(&self, user_id: &str, chat_id: &str) -> Option<ChatHistory> {
        self.list(user_id).into_iter().find(|h| h.id == chat_id)
    }

    /// Replace a conversation's messages and refresh its update time.
    /// Unknown ids are a silent no-op.
    pub fn update(
        &self,
        user_id: &str,
        chat_id: &str,
        messages: &[Message],
    ) -> Result<(), StorageError> {
        let mut histories = self.list(user_id);
        let Some(history) = histories.iter_mut().find(|h| h.id == chat_id) else {
            return Ok(());
        };
        history.messages = messages.to_vec();
        history.last_updated = Utc::now();
        set_json(&self.store, &key_for(user_id), &histories)
    }

    pub fn delete(&self, user_id: &str, chat_id: &str) -> Result<(), StorageError> {
        let mut histories = self.list(user_id);
        histories.retain(|h| h.id != chat_id);
        set_json(&self.store, &key_for(user_id), &histories)
    }

    pub fn clear(&self, user_id: &str) -> Result<(), StorageError> {
        self.store.remove(&key_for(user_id))
    }
}

fn key_for(user_id: &str) -> String {
    format!("chat_histories_{user_id}")
}

fn auto_title(messages: &[Message]) -> String {
    match messages.iter().find(|m| m.is_user()) {
        Some(message) => {
            let prefix: String = message.content.chars().take(TITLE_PREFIX_CHARS).collect();
            format!("{prefix}...")
        }
        None => "New Chat".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const USER: &str = "user_1";

    fn store() -> ChatHistoryStore<MemoryStore> {
        ChatHistoryStore::new(MemoryStore::new())
    }

    fn exchange(question: &str) -> Vec<Message> {
        vec![Message::user(question), Message::assistant("reply")]
    }

    #[test]
    fn collection_is_capped_at_ten_and_drops_the_oldest() {
        let histories = store();
        for i in 0..11 {
            histories
                .save(USER, None, &exchange(&format!("question {i}")), ExpertiseRole::Operations)
                .expect("save");
        }

        let listed = histories.list(USER);
        assert_eq!(listed.len(), MAX_HISTORIES);
        // Newest first; the very first save has been evicted.
        assert!(listed[0].title.starts_with("question 10"));
        assert!(!listed.iter().any(|h| h.title.starts_with("question 0...")));
    }

    #[test]
    fn titles_come_from_the_first_user_message() {
        let histories = store();
        let long_question = "How do I stabilize free lime variation in the kiln feed blend?";
        let saved = histories
            .save(USER, None, &exchange(long_question), ExpertiseRole::Operations)
            .expect("save");

        let expected: String = long_question.chars().take(30).collect();
        assert_eq!(saved.title, format!("{expected}..."));

        let titled = histories
            .save(USER, Some("Kiln feed"), &exchange("q"), ExpertiseRole::Operations)
            .expect("save titled");
        assert_eq!(titled.title, "Kiln feed");
    }

    #[test]
    fn assistant_only_sessions_fall_back_to_a_default_title() {
        let histories = store();
        let saved = histories
            .save(
                USER,
                None,
                &[Message::assistant("unsolicited advice")],
                ExpertiseRole::Operations,
            )
            .expect("save");
        assert_eq!(saved.title, "New Chat");
    }

    #[test]
    fn get_update_and_delete_operate_on_one_entry() {
        let histories = store();
        let saved = histories
            .save(USER, None, &exchange("first"), ExpertiseRole::Procurement)
            .expect("save");
        let other = histories
            .save(USER, None, &exchange("second"), ExpertiseRole::Operations)
            .expect("save other");

        let fetched = histories.get(USER, &saved.id).expect("get");
        assert_eq!(fetched.role, ExpertiseRole::Procurement);

        let grown = vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("follow-up"),
        ];
        histories.update(USER, &saved.id, &grown).expect("update");
        let updated = histories.get(USER, &saved.id).expect("get updated");
        assert_eq!(updated.messages.len(), 3);
        assert!(updated.last_updated >= updated.created_at);

        histories.delete(USER, &saved.id).expect("delete");
        assert!(histories.get(USER, &saved.id).is_none());
        assert!(histories.get(USER, &other.id).is_some());
    }

    #[test]
    fn updating_an_unknown_id_is_a_silent_no_op() {
        let histories = store();
        histories
            .save(USER, None, &exchange("q"), ExpertiseRole::Operations)
            .expect("save");

        histories
            .update(USER, "chat_does_not_exist", &exchange("other"))
            .expect("no-op update");
        assert_eq!(histories.list(USER).len(), 1);
    }

    #[test]
    fn clear_removes_everything_for_one_user_only() {
        let histories = store();
        histories
            .save(USER, None, &exchange("mine"), ExpertiseRole::Operations)
            .expect("save");
        histories
            .save("user_2", None, &exchange("theirs"), ExpertiseRole::Operations)
            .expect("save other user");

        histories.clear(USER).expect("clear");
        assert!(histories.list(USER).is_empty());
        assert_eq!(histories.list("user_2").len(), 1);
    }

    #[test]
    fn corrupted_collections_read_as_empty() {
        let raw = MemoryStore::new();
        raw.set(&key_for(USER), "[{broken").expect("seed");
        let histories = ChatHistoryStore::new(raw);
        assert!(histories.list(USER).is_empty());
    }
}
