use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversations are capped at this many most-recent messages.
pub const MAX_CONVERSATION_MESSAGES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A chat conversation, persisted in the fast KV store with a 7-day
/// sliding expiration and capped at `MAX_CONVERSATION_MESSAGES` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: uuid::Uuid,
    pub owner: i64,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: uuid::Uuid, owner: i64) -> Self {
        Self {
            id,
            owner,
            messages: Vec::new(),
        }
    }

    /// Append a message and truncate to the most recent
    /// `MAX_CONVERSATION_MESSAGES` entries.
    pub fn push_and_truncate(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > MAX_CONVERSATION_MESSAGES {
            let excess = self.messages.len() - MAX_CONVERSATION_MESSAGES;
            self.messages.drain(0..excess);
        }
    }

    /// The last `n` messages, oldest first.
    pub fn last_n(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}
