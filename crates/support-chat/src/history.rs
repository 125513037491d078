//! Conversation history.
//!
//! An append-only, insertion-ordered log of the turns exchanged in one
//! session. Capacity management is the caller's concern; the log itself
//! never evicts, reorders, or deduplicates.

use chrono::{DateTime, Utc};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged in either direction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub role: Role,
    /// Display text. Structured intent blocks are stripped before a turn is
    /// recorded, so this never contains raw fenced JSON.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// True when the content is a surfaced failure rather than a reply.
    #[serde(default)]
    pub is_error: bool,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    /// An assistant-side turn carrying a surfaced failure.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: true,
        }
    }
}

/// Append-only ordered sequence of turns.
#[derive(Debug, Default)]
pub struct MessageHistory {
    turns: Vec<Turn>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Undo the most recent turn. Used only to retract a speculative user
    /// turn before a retry re-appends it.
    pub fn remove_last(&mut self) -> Option<Turn> {
        self.turns.pop()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn as_slice(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut history = MessageHistory::new();
        history.append(Turn::user("first"));
        history.append(Turn::assistant("second"));
        history.append(Turn::user("third"));

        let contents: Vec<_> = history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn remove_last_pops_in_reverse_order() {
        let mut history = MessageHistory::new();
        history.append(Turn::user("kept"));
        history.append(Turn::user("retracted"));

        let popped = history.remove_last().unwrap();
        assert_eq!(popped.content, "retracted");
        assert_eq!(history.len(), 1);
        assert_eq!(history.as_slice()[0].content, "kept");
    }

    #[test]
    fn remove_last_on_empty_is_none() {
        let mut history = MessageHistory::new();
        assert!(history.remove_last().is_none());
    }

    #[test]
    fn clear_empties_the_log() {
        let mut history = MessageHistory::new();
        history.append(Turn::user("hi"));
        history.append(Turn::assistant("hello"));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn duplicate_turns_are_kept() {
        let mut history = MessageHistory::new();
        history.append(Turn::user("same"));
        history.append(Turn::user("same"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn error_turn_is_flagged() {
        let turn = Turn::error("connection failed");
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.is_error);

        let regular = Turn::assistant("hello");
        assert!(!regular.is_error);
    }

    #[test]
    fn turn_serialization_round_trips() {
        let turn = Turn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content, "hello");
        assert_eq!(back.role, Role::User);
    }
}
