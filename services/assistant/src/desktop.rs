//! Operating-system implementations of the handler collaborators.

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use jarvis_core::handlers::{AppControl, Browser, KeyPresser, MediaKey, OpenOutcome};
use std::path::Path;
use sysinfo::System;
use tracing::{debug, info, warn};

/// Opens URLs and files with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[async_trait]
impl Browser for SystemBrowser {
    async fn open_url(&self, url: &str) -> anyhow::Result<()> {
        debug!(url, "Opening URL");
        open::that_detached(url).with_context(|| format!("Failed to open {}", url))
    }

    async fn open_path(&self, path: &Path) -> anyhow::Result<()> {
        debug!(path = %path.display(), "Opening file");
        open::that_detached(path).with_context(|| format!("Failed to open {}", path.display()))
    }
}

/// Launches applications as child processes and closes them by process name.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemApps;

impl SystemApps {
    fn launcher(name: &str) -> tokio::process::Command {
        if cfg!(target_os = "macos") {
            let mut command = tokio::process::Command::new("open");
            command.arg("-a").arg(name);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = tokio::process::Command::new("cmd");
            command.args(["/C", "start", ""]).arg(name);
            command
        } else {
            tokio::process::Command::new(name.to_lowercase().replace(' ', "-"))
        }
    }
}

/// Lowercased with spaces and any `.exe` suffix removed.
fn process_key(name: &str) -> String {
    let key: String = name.to_lowercase().split_whitespace().collect();
    match key.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => key,
    }
}

/// A process belongs to an application only when the normalized names are equal.
fn matches_process(process_name: &str, target: &str) -> bool {
    process_key(process_name) == target
}

#[async_trait]
impl AppControl for SystemApps {
    async fn open_app(&self, name: &str) -> anyhow::Result<OpenOutcome> {
        match Self::launcher(name).spawn() {
            Ok(child) => {
                info!(app = name, pid = ?child.id(), "Application launched");
                Ok(OpenOutcome::Launched)
            }
            Err(e) => {
                warn!(app = name, error = %e, "No launchable application; searching the web instead");
                let url = jarvis_core::handlers::web::google_search_url(name);
                open::that_detached(&url).with_context(|| format!("Failed to open {}", url))?;
                Ok(OpenOutcome::SearchedWeb)
            }
        }
    }

    async fn close_app(&self, name: &str) -> anyhow::Result<()> {
        let target = process_key(name);
        if target.is_empty() {
            bail!("No application name given");
        }
        let killed = tokio::task::spawn_blocking(move || {
            let sys = System::new_all();
            sys.processes()
                .values()
                .filter(|p| matches_process(&p.name().to_string_lossy(), &target))
                .filter(|p| p.kill())
                .count()
        })
        .await
        .map_err(|e| anyhow!("Process scan failed: {}", e))?;

        if killed == 0 {
            bail!("No running process matches {}", name);
        }
        info!(app = name, killed, "Application closed");
        Ok(())
    }
}

/// Presses media keys through the platform input API.
#[cfg(feature = "media-keys")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeys;

#[cfg(feature = "media-keys")]
#[async_trait]
impl KeyPresser for SystemKeys {
    async fn press(&self, key: MediaKey) -> anyhow::Result<()> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        let key = match key {
            MediaKey::VolumeMute => Key::VolumeMute,
            MediaKey::VolumeUp => Key::VolumeUp,
            MediaKey::VolumeDown => Key::VolumeDown,
        };
        tokio::task::spawn_blocking(move || {
            let mut enigo = Enigo::new(&Settings::default())
                .map_err(|e| anyhow!("Failed to create input device: {:?}", e))?;
            enigo
                .key(key, Direction::Click)
                .map_err(|e| anyhow!("Failed to press key: {:?}", e))
        })
        .await
        .map_err(|e| anyhow!("Key press task failed: {}", e))?
    }
}

/// Stand-in used when the binary is built without the `media-keys` feature.
#[cfg(not(feature = "media-keys"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemKeys;

#[cfg(not(feature = "media-keys"))]
#[async_trait]
impl KeyPresser for SystemKeys {
    async fn press(&self, key: MediaKey) -> anyhow::Result<()> {
        debug!(?key, "Media key requested without input support");
        bail!("Media keys are not available in this build; rebuild with --features media-keys")
    }
}
