//! Web search and video playback in the default browser.

use super::{ActionHandler, Browser, VideoFinder};
use crate::providers::http_client;
use anyhow::{Context, bail};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search?q=";
const YOUTUBE_SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

pub fn google_search_url(query: &str) -> String {
    format!("{}{}", GOOGLE_SEARCH_URL, urlencoding::encode(query.trim()))
}

pub fn youtube_search_url(query: &str) -> String {
    format!("{}{}", YOUTUBE_SEARCH_URL, urlencoding::encode(query.trim()))
}

fn require_query(query: &str) -> anyhow::Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        bail!("No search terms given");
    }
    Ok(query)
}

pub struct GoogleSearchHandler {
    browser: Arc<dyn Browser>,
}

impl GoogleSearchHandler {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl ActionHandler for GoogleSearchHandler {
    async fn handle(&self, query: &str) -> anyhow::Result<String> {
        let query = require_query(query)?;
        self.browser
            .open_url(&google_search_url(query))
            .await
            .context("Failed to perform Google search")?;
        Ok(format!("Performed Google search for {}", query))
    }
}

pub struct YoutubeSearchHandler {
    browser: Arc<dyn Browser>,
}

impl YoutubeSearchHandler {
    pub fn new(browser: Arc<dyn Browser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl ActionHandler for YoutubeSearchHandler {
    async fn handle(&self, query: &str) -> anyhow::Result<String> {
        let query = require_query(query)?;
        self.browser
            .open_url(&youtube_search_url(query))
            .await
            .context("Failed to perform YouTube search")?;
        Ok(format!("Performed YouTube search for {}", query))
    }
}

/// Plays the first YouTube result for a query, or shows the results page
/// when no single video can be resolved.
pub struct PlayHandler {
    browser: Arc<dyn Browser>,
    finder: Arc<dyn VideoFinder>,
}

impl PlayHandler {
    pub fn new(browser: Arc<dyn Browser>, finder: Arc<dyn VideoFinder>) -> Self {
        Self { browser, finder }
    }
}

#[async_trait]
impl ActionHandler for PlayHandler {
    async fn handle(&self, query: &str) -> anyhow::Result<String> {
        let query = require_query(query)?;
        let url = match self.finder.first_video(query).await {
            Ok(Some(url)) => url,
            Ok(None) => youtube_search_url(query),
            Err(e) => {
                warn!(error = %e, "Video lookup failed; opening search results instead");
                youtube_search_url(query)
            }
        };
        self.browser
            .open_url(&url)
            .await
            .context("Failed to play YouTube video")?;
        Ok(format!("Playing YouTube video for {}", query))
    }
}

static VIDEO_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:"videoId":"|/watch\?v=)([A-Za-z0-9_-]{11})"#).expect("valid video id regex")
});

/// Pulls the first video id out of a YouTube results page.
pub fn extract_video_id(page: &str) -> Option<String> {
    VIDEO_ID_REGEX
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

/// Finds videos by fetching YouTube's public results page.
pub struct YoutubeFinder {
    client: Client,
}

impl YoutubeFinder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl VideoFinder for YoutubeFinder {
    async fn first_video(&self, query: &str) -> anyhow::Result<Option<String>> {
        let page = self
            .client
            .get(youtube_search_url(query))
            .send()
            .await
            .context("YouTube search request failed")?
            .error_for_status()?
            .text()
            .await?;
        let id = extract_video_id(&page);
        debug!(query, video_id = ?id, "Resolved YouTube video");
        Ok(id.map(|id| format!("{}{}", YOUTUBE_WATCH_URL, id)))
    }
}
