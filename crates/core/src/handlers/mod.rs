//! Action handlers and the external collaborators they drive.
//!
//! Each handler receives the single argument string of a command and returns
//! a human-readable status. The operating-system side effects (launching a
//! process, opening a URL, pressing a media key) sit behind the small traits
//! below so the dispatcher can be exercised without touching the desktop.

pub mod apps;
pub mod chat;
pub mod content;
pub mod system;
pub mod web;

use async_trait::async_trait;
use std::path::Path;

pub use apps::{CloseAppHandler, OpenAppHandler};
pub use chat::{ChatMode, ConversationHandler, Persona};
pub use content::ContentHandler;
pub use system::SystemHandler;
pub use web::{GoogleSearchHandler, PlayHandler, YoutubeFinder, YoutubeSearchHandler};

/// Executes one kind of command.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, argument: &str) -> anyhow::Result<String>;
}

/// What an open request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A local application was started.
    Launched,
    /// Nothing was installed under that name; a web search was opened instead.
    SearchedWeb,
}

/// Launches and terminates desktop applications by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppControl: Send + Sync {
    async fn open_app(&self, name: &str) -> anyhow::Result<OpenOutcome>;
    async fn close_app(&self, name: &str) -> anyhow::Result<()>;
}

/// Hands URLs and files to the system's default viewer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open_url(&self, url: &str) -> anyhow::Result<()>;
    async fn open_path(&self, path: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    VolumeMute,
    VolumeUp,
    VolumeDown,
}

/// Synthesizes media key presses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyPresser: Send + Sync {
    async fn press(&self, key: MediaKey) -> anyhow::Result<()>;
}

/// Resolves a search query to the URL of a single playable video.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoFinder: Send + Sync {
    async fn first_video(&self, query: &str) -> anyhow::Result<Option<String>>;
}

/// Answers an `exit` command. The session loop decides whether to stop.
pub struct ExitHandler {
    farewell: String,
}

impl ExitHandler {
    pub fn new(farewell: impl Into<String>) -> Self {
        Self {
            farewell: farewell.into(),
        }
    }
}

#[async_trait]
impl ActionHandler for ExitHandler {
    async fn handle(&self, _argument: &str) -> anyhow::Result<String> {
        Ok(self.farewell.clone())
    }
}
