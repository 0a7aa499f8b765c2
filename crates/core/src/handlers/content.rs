//! Long-form writing: letters, essays, code, emails.

use super::{ActionHandler, Browser};
use crate::engine::AnswerEngine;
use crate::providers::ChatRequest;
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const WRITER_INSTRUCTION: &str = "You are a content writer. Write letters, applications, \
essays, code, notes, songs and poems exactly as requested. Reply with the content only.";

const CONTENT_MAX_TOKENS: u32 = 2048;

/// File name a topic's content is saved under: lowercase, whitespace runs
/// replaced by underscores, path-hostile characters dropped.
pub fn content_file_name(topic: &str) -> String {
    let stem = topic
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "content.txt".to_string()
    } else {
        format!("{}.txt", stem)
    }
}

pub struct ContentHandler {
    engine: Arc<AnswerEngine>,
    browser: Arc<dyn Browser>,
    data_dir: PathBuf,
}

impl ContentHandler {
    pub fn new(engine: Arc<AnswerEngine>, browser: Arc<dyn Browser>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            browser,
            data_dir: data_dir.into(),
        }
    }

    async fn save(&self, topic: &str, content: &str) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        let path = self.data_dir.join(content_file_name(topic));
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    async fn show(&self, path: &Path) {
        if let Err(e) = self.browser.open_path(path).await {
            warn!(path = %path.display(), error = %e, "Saved content could not be opened");
        }
    }
}

#[async_trait]
impl ActionHandler for ContentHandler {
    async fn handle(&self, topic: &str) -> anyhow::Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("No topic given for content");
        }

        let request = ChatRequest::new(topic)
            .with_system(WRITER_INSTRUCTION)
            .with_max_tokens(CONTENT_MAX_TOKENS);
        let content = self
            .engine
            .try_complete(&request)
            .await
            .map_err(|e| anyhow!(e))?;

        let path = self.save(topic, &content).await?;
        info!(path = %path.display(), bytes = content.len(), "Content written");
        self.show(&path).await;
        Ok(format!("Content for {} written to {}", topic, path.display()))
    }
}
