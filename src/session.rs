//! Conversation session
//!
//! Ordered, append-only message history for one chat. The first two
//! entries are the fixed persona bootstrap pair; they are excluded from
//! user-facing rendering and from previous-conversation context so the
//! persona is never re-fed as if it were dialogue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of prior user/assistant exchanges carried into the prompt
pub const HISTORY_EXCHANGE_CAP: usize = 4;

/// Assistant persona instructions, seeded as the first session message
pub const PERSONA: &str = "You are Flaix, a helpful and knowledgeable financial assistant designed specifically for Indian users. Your purpose is to improve financial literacy and provide guidance on investments in the Indian market.\n\nKey responsibilities:\n1. Explain financial concepts in simple, easy-to-understand language\n2. Provide information about different investment options available in India (stocks, mutual funds, bonds, PPF, FDs, etc.)\n3. Help users understand investment risks and returns\n4. Explain tax implications of different investments in the Indian context\n5. Guide users on how to start investing based on their goals and risk tolerance\n6. Answer questions about market trends and financial news in India";

/// Fixed acknowledgment completing the persona bootstrap pair
pub const PERSONA_ACK: &str = "Hello! I am Flaix, your financial assistant. You can ask me about investments, financial planning, or any other financial topic.";

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the session history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content,
        }
    }
}

/// Append-only chat history; no persistence across sessions
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<Message>,
}

impl ChatSession {
    /// Create a session seeded with the persona bootstrap pair.
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::new(),
        };
        session.seed_bootstrap();
        session
    }

    fn seed_bootstrap(&mut self) {
        self.messages
            .push(Message::new(Role::User, PERSONA.to_string()));
        self.messages
            .push(Message::new(Role::Assistant, PERSONA_ACK.to_string()));
    }

    pub fn push_user(&mut self, content: String) {
        self.messages.push(Message::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: String) {
        self.messages.push(Message::new(Role::Assistant, content));
    }

    /// Restore the session to its freshly-bootstrapped state.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.seed_bootstrap();
    }

    /// Total message count, bootstrap pair included
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Messages suitable for user-facing rendering (bootstrap excluded)
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().skip(2)
    }

    /// The most recent prior exchanges, bootstrap pair excluded.
    ///
    /// Returns at most `cap` user/assistant pairs' worth of messages,
    /// oldest first.
    pub fn recent_exchanges(&self, cap: usize) -> &[Message] {
        let dialogue = &self.messages[2.min(self.messages.len())..];
        let keep = (cap * 2).min(dialogue.len());
        &dialogue[dialogue.len() - keep..]
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_bootstrapped() {
        let session = ChatSession::new();

        assert_eq!(session.message_count(), 2);
        assert_eq!(session.visible_messages().count(), 0);
        assert!(session.recent_exchanges(HISTORY_EXCHANGE_CAP).is_empty());
    }

    #[test]
    fn test_appends_preserve_order() {
        let mut session = ChatSession::new();
        session.push_user("What is RSI?".to_string());
        session.push_assistant("RSI is a momentum oscillator.".to_string());

        let visible: Vec<_> = session.visible_messages().collect();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].role, Role::User);
        assert_eq!(visible[1].role, Role::Assistant);
    }

    #[test]
    fn test_recent_exchanges_excludes_bootstrap() {
        let mut session = ChatSession::new();
        session.push_user("q1".to_string());
        session.push_assistant("a1".to_string());

        let recent = session.recent_exchanges(HISTORY_EXCHANGE_CAP);
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|m| m.content != PERSONA));
        assert!(recent.iter().all(|m| m.content != PERSONA_ACK));
    }

    #[test]
    fn test_recent_exchanges_capped() {
        let mut session = ChatSession::new();
        for i in 0..10 {
            session.push_user(format!("q{}", i));
            session.push_assistant(format!("a{}", i));
        }

        let recent = session.recent_exchanges(4);
        assert_eq!(recent.len(), 8);
        assert_eq!(recent[0].content, "q6");
        assert_eq!(recent[7].content, "a9");
    }

    #[test]
    fn test_reset_restores_bootstrap_only() {
        let mut session = ChatSession::new();
        session.push_user("q".to_string());
        session.push_assistant("a".to_string());

        session.reset();

        assert_eq!(session.message_count(), 2);
        assert_eq!(session.visible_messages().count(), 0);
    }
}
