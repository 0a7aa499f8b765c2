//! Opening and closing desktop applications.

use super::{ActionHandler, AppControl, OpenOutcome};
use anyhow::{Context, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct OpenAppHandler {
    apps: Arc<dyn AppControl>,
}

impl OpenAppHandler {
    pub fn new(apps: Arc<dyn AppControl>) -> Self {
        Self { apps }
    }
}

#[async_trait]
impl ActionHandler for OpenAppHandler {
    async fn handle(&self, name: &str) -> anyhow::Result<String> {
        let name = name.trim();
        if name.is_empty() {
            bail!("No application name given to open");
        }
        let outcome = self
            .apps
            .open_app(name)
            .await
            .with_context(|| format!("Failed to open {}", name))?;
        Ok(match outcome {
            OpenOutcome::Launched => format!("Successfully opened {}", name),
            OpenOutcome::SearchedWeb => format!(
                "Could not find {} installed; searched the web for it instead",
                name
            ),
        })
    }
}

/// Closes applications, except Chrome which is never closed.
pub struct CloseAppHandler {
    apps: Arc<dyn AppControl>,
}

impl CloseAppHandler {
    pub fn new(apps: Arc<dyn AppControl>) -> Self {
        Self { apps }
    }
}

#[async_trait]
impl ActionHandler for CloseAppHandler {
    async fn handle(&self, name: &str) -> anyhow::Result<String> {
        let name = name.trim();
        if name.is_empty() {
            bail!("No application name given to close");
        }
        if name.to_lowercase().contains("chrome") {
            info!(app = name, "Close request for Chrome ignored");
            return Ok("Skipped closing Chrome".to_string());
        }
        self.apps
            .close_app(name)
            .await
            .with_context(|| format!("Failed to close {}", name))?;
        Ok(format!("Successfully closed {}", name))
    }
}
