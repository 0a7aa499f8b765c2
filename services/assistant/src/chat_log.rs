use anyhow::Context;
use async_trait::async_trait;
use jarvis_core::conversation::{ConversationLog, ConversationStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stores the conversation as a pretty-printed JSON array of `{role, content}`.
pub struct JsonChatLog {
    path: PathBuf,
}

impl JsonChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConversationStore for JsonChatLog {
    /// A missing, empty or unreadable file starts a fresh conversation.
    async fn load(&self) -> anyhow::Result<ConversationLog> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No chat log yet");
                return Ok(ConversationLog::new());
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Chat log unreadable; starting fresh");
                return Ok(ConversationLog::new());
            }
        };
        if raw.trim().is_empty() {
            return Ok(ConversationLog::new());
        }
        match serde_json::from_str::<ConversationLog>(&raw) {
            Ok(log) => {
                debug!(path = %self.path.display(), turns = log.len(), "Chat log loaded");
                Ok(log)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Chat log is not valid JSON; starting fresh");
                Ok(ConversationLog::new())
            }
        }
    }

    async fn save(&self, log: &ConversationLog) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(log)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write chat log {}", self.path.display()))
    }
}
