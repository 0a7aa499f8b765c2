//! Conversational answers backed by the answer engine and the session log.

use super::ActionHandler;
use crate::conversation::{ConversationLog, ConversationStore};
use crate::engine::AnswerEngine;
use crate::providers::ChatRequest;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Turns of prior conversation sent with each question.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const CLOCK_FORMAT: &str = "%A, %B %d, %Y %I:%M %p";

/// Who the assistant is and who it is talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub username: String,
    pub assistant_name: String,
}

impl Persona {
    pub fn new(username: impl Into<String>, assistant_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            assistant_name: assistant_name.into(),
        }
    }

    fn instruction(&self) -> String {
        format!(
            "You are {assistant}, a very accurate and advanced AI assistant created by {user}. \
             Answer in English only, even if the question is asked in another language. \
             Keep answers short and to the point, and do not mention your training data.",
            assistant = self.assistant_name,
            user = self.username,
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new("User", "Jarvis")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    General,
    /// Adds the current date and time, and answers clock questions locally.
    Realtime,
}

/// True when the query asks for the current time or date.
pub fn is_clock_query(query: &str) -> bool {
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .any(|word| word == "time" || word == "date")
}

fn clock_reading(now: &DateTime<Local>) -> String {
    now.format(CLOCK_FORMAT).to_string()
}

pub struct ConversationHandler {
    engine: Arc<AnswerEngine>,
    log: Arc<Mutex<ConversationLog>>,
    store: Option<Arc<dyn ConversationStore>>,
    persona: Persona,
    mode: ChatMode,
    history_window: usize,
}

impl ConversationHandler {
    pub fn new(
        engine: Arc<AnswerEngine>,
        log: Arc<Mutex<ConversationLog>>,
        persona: Persona,
        mode: ChatMode,
    ) -> Self {
        Self {
            engine,
            log,
            store: None,
            persona,
            mode,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    async fn request_for(&self, query: &str, now: &DateTime<Local>) -> ChatRequest {
        let mut system = self.persona.instruction();
        if self.mode == ChatMode::Realtime {
            system.push_str(&format!(" The current date and time is {}.", clock_reading(now)));
        }
        let history = self.log.lock().await.recent(self.history_window);
        ChatRequest::new(query).with_system(system).with_history(history)
    }

    async fn remember(&self, query: &str, answer: &str) {
        let snapshot = {
            let mut log = self.log.lock().await;
            log.record_exchange(query, answer);
            log.clone()
        };
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&snapshot).await {
                warn!(error = %e, "Failed to persist conversation log");
            }
        }
    }
}

#[async_trait]
impl ActionHandler for ConversationHandler {
    #[instrument(name = "conversation", skip_all, fields(mode = ?self.mode))]
    async fn handle(&self, query: &str) -> anyhow::Result<String> {
        let query = query.trim();
        let now = Local::now();

        let answer = if self.mode == ChatMode::Realtime && is_clock_query(query) {
            debug!("Answering clock query locally");
            format!("It is {}.", clock_reading(&now))
        } else {
            let request = self.request_for(query, &now).await;
            self.engine
                .try_complete(&request)
                .await
                .map_err(|e| anyhow!(e))?
        };

        self.remember(query, &answer).await;
        Ok(answer)
    }
}
