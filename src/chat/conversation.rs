//! Conversation Store
//!
//! Ordered, append-only transcript of one chat session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::chat::WELCOME_MESSAGE;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Transcript for one session; the last element is the most recent turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    /// Empty store (no welcome turn)
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the welcome turn
    pub fn seeded() -> Self {
        let mut store = Self::new();
        store.reset();
        store
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Full ordered transcript
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Replace the transcript with the single welcome turn
    pub fn reset(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(WELCOME_MESSAGE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("I have eggs"));
        store.append(Turn::assistant("Try an omelette"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].role(), Role::User);
        assert_eq!(store.last().unwrap().content(), "Try an omelette");
    }

    #[test]
    fn test_reset_seeds_welcome() {
        let mut store = ConversationStore::new();
        store.append(Turn::user("hello"));
        store.append(Turn::user("anyone?"));
        store.reset();

        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].role(), Role::Assistant);
        assert!(store.all()[0].content().starts_with("Hi! I'm Ali"));
        assert_eq!(ConversationStore::seeded(), store);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::user("x")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"x"}"#);
    }
}
