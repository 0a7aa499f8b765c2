use super::{ActionHandler, KeyPresser, MediaKey};
use anyhow::{Context, bail};
use async_trait::async_trait;
use std::sync::Arc;

/// Volume control through synthesized media keys.
pub struct SystemHandler {
    keys: Arc<dyn KeyPresser>,
}

impl SystemHandler {
    pub fn new(keys: Arc<dyn KeyPresser>) -> Self {
        Self { keys }
    }

    // Mute and unmute share the toggle key.
    fn key_for(task: &str) -> Option<(MediaKey, &'static str)> {
        match task {
            "mute" => Some((MediaKey::VolumeMute, "Muted")),
            "unmute" => Some((MediaKey::VolumeMute, "Unmuted")),
            "volume up" => Some((MediaKey::VolumeUp, "Volume increased")),
            "volume down" => Some((MediaKey::VolumeDown, "Volume decreased")),
            _ => None,
        }
    }
}

#[async_trait]
impl ActionHandler for SystemHandler {
    async fn handle(&self, task: &str) -> anyhow::Result<String> {
        let normalized = task.trim().to_lowercase();
        let Some((key, status)) = Self::key_for(&normalized) else {
            bail!("Unknown system command: {}", task.trim());
        };
        self.keys
            .press(key)
            .await
            .with_context(|| format!("Failed to execute system command {}", normalized))?;
        Ok(status.to_string())
    }
}
