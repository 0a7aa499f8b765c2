//! The session's conversation history and the seam used to persist it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged turn, serialized as `{"role": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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
}

/// Append-only history of a session, oldest turn first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ChatMessage>) -> Self {
        Self { turns }
    }

    /// Appends a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(ChatMessage::user(user));
        self.turns.push(ChatMessage::assistant(assistant));
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// The last `limit` turns, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        let start = self.turns.len().saturating_sub(limit);
        self.turns[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Durable storage for the conversation log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Reads the stored log; an absent or empty store yields an empty log.
    async fn load(&self) -> anyhow::Result<ConversationLog>;

    /// Rewrites the stored log in full.
    async fn save(&self, log: &ConversationLog) -> anyhow::Result<()>;
}
