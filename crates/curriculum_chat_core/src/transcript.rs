//! crates/curriculum_chat_core/src/transcript.rs
//!
//! Ordered per-course conversation transcripts.

use std::collections::HashMap;

use crate::domain::Message;

/// Append-only store of the question/answer history for each course.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: HashMap<String, Vec<Message>>,
    max_messages_per_course: Option<usize>,
}

impl ConversationStore {
    /// `max_messages_per_course` bounds each transcript, dropping the
    /// oldest entries first. `None` keeps transcripts unbounded.
    pub fn new(max_messages_per_course: Option<usize>) -> Self {
        Self {
            messages: HashMap::new(),
            max_messages_per_course,
        }
    }

    /// Appends a message, preserving insertion order. No deduplication.
    pub fn append(&mut self, course_id: &str, message: Message) {
        let transcript = self.messages.entry(course_id.to_string()).or_default();
        transcript.push(message);
        if let Some(cap) = self.max_messages_per_course {
            if transcript.len() > cap {
                let excess = transcript.len() - cap;
                transcript.drain(..excess);
            }
        }
    }

    /// The transcript for a course in creation order. Empty if the course
    /// has no messages yet.
    pub fn list(&self, course_id: &str) -> &[Message] {
        self.messages
            .get(course_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Drops one course's entire transcript.
    pub fn clear(&mut self, course_id: &str) {
        self.messages.remove(course_id);
    }

    /// Drops every transcript.
    pub fn clear_all(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut store = ConversationStore::new(None);
        store.append("mkt", Message::user("first"));
        store.append("mkt", Message::assistant("second"));
        store.append("mkt", Message::user("third"));

        let contents: Vec<&str> = store
            .list("mkt")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn list_of_unknown_course_is_empty() {
        let store = ConversationStore::new(None);
        assert!(store.list("acc-en").is_empty());
    }

    #[test]
    fn retention_cap_drops_oldest_first() {
        let mut store = ConversationStore::new(Some(3));
        for text in ["a", "b", "c", "d", "e"] {
            store.append("mkt", Message::user(text));
        }

        let contents: Vec<&str> = store
            .list("mkt")
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["c", "d", "e"]);
    }

    #[test]
    fn transcripts_are_isolated_per_course() {
        let mut store = ConversationStore::new(None);
        store.append("mkt", Message::user("marketing"));
        store.append("corp-acc", Message::user("accounting"));

        assert_eq!(store.list("mkt").len(), 1);
        assert_eq!(store.list("corp-acc").len(), 1);
        store.clear("mkt");
        assert!(store.list("mkt").is_empty());
        assert_eq!(store.list("corp-acc").len(), 1);
    }
}
