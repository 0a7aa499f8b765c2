//! Remote language-model backends behind one capability trait.
//!
//! Every adapter turns a [`ChatRequest`] into exactly one HTTP call and maps
//! every transport or protocol fault into a [`FailureReason`]. Callers never
//! see a raw `reqwest` error.

pub mod cohere;
pub mod openai;

use crate::conversation::ChatMessage;
use crate::rate_limit::RateLimit;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub use cohere::CohereClient;
pub use openai::OpenAICompatibleClient;

/// Transport timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a provider call produced no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FailureReason {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider rejected the request")]
    MalformedRequest,
    #[error("transport error")]
    TransportError,
    #[error("missing or invalid credential")]
    Unauthenticated,
    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// A provider-neutral chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// System instruction (preamble) placed ahead of the conversation.
    pub system: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<ChatMessage>,
    /// The new user message.
    pub message: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            message: message.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A generic client for one remote language-model backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Stable provider name, used as the rate-limit key.
    fn name(&self) -> &str;

    /// Sends one chat completion request and returns the first completion's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, FailureReason>;

    /// Asks a single free-standing question.
    async fn ask(&self, query: &str) -> Result<String, FailureReason> {
        self.complete(&ChatRequest::new(query)).await
    }
}

/// The backends the assistant knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Cohere,
    Groq,
    OpenAI,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Cohere, ProviderKind::Groq, ProviderKind::OpenAI];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Cohere => "cohere",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAI => "openai",
        }
    }

    /// Parses a provider name as used in configuration (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            ProviderKind::Cohere => "https://api.cohere.com/v1/chat",
            ProviderKind::Groq => "https://api.groq.com/openai/v1/chat/completions",
            ProviderKind::OpenAI => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Cohere => "command-r-plus",
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenAI => "gpt-3.5-turbo",
        }
    }

    /// Provider-specific limit layered on top of the shared minimum interval.
    pub fn rate_limit(self, min_interval: Duration) -> RateLimit {
        match self {
            ProviderKind::Cohere => {
                RateLimit::interval(min_interval).with_window(8, Duration::from_secs(60))
            }
            ProviderKind::Groq | ProviderKind::OpenAI => RateLimit::interval(min_interval),
        }
    }
}

/// Static, immutable configuration of one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub credential: Option<String>,
    pub endpoint: String,
    pub model: String,
    /// Lower ranks are tried first.
    pub priority_rank: usize,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind, credential: Option<String>, priority_rank: usize) -> Self {
        Self {
            kind,
            credential,
            endpoint: kind.default_endpoint().to_string(),
            model: kind.default_model().to_string(),
            priority_rank,
            temperature: 0.7,
            max_tokens: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The trimmed credential, if one is present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.credential().is_some()
    }
}

/// Builds the adapter for `config`, or `None` when its credential is absent.
pub fn build_provider(config: &ProviderConfig) -> Option<Arc<dyn ChatProvider>> {
    if !config.is_enabled() {
        warn!(
            provider = config.name(),
            "No credential configured; provider disabled"
        );
        return None;
    }
    let client = http_client(config.timeout);
    let provider: Arc<dyn ChatProvider> = match config.kind {
        ProviderKind::Cohere => Arc::new(CohereClient::new(client, config.clone())),
        ProviderKind::Groq | ProviderKind::OpenAI => {
            Arc::new(OpenAICompatibleClient::new(client, config.clone()))
        }
    };
    Some(provider)
}

/// Builds the enabled adapters in ascending priority order.
pub fn build_providers(configs: &[ProviderConfig]) -> Vec<Arc<dyn ChatProvider>> {
    let mut ordered: Vec<&ProviderConfig> = configs.iter().collect();
    ordered.sort_by_key(|config| config.priority_rank);
    ordered.into_iter().filter_map(build_provider).collect()
}

pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Maps a non-success HTTP status onto a failure reason.
pub fn classify_status(status: StatusCode) -> Option<FailureReason> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => FailureReason::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureReason::Unauthenticated,
        s if s.is_client_error() => FailureReason::MalformedRequest,
        _ => FailureReason::TransportError,
    })
}

/// Posts `body` as JSON with bearer auth and decodes the JSON reply.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    provider: &str,
    endpoint: &str,
    credential: &str,
    body: &B,
) -> Result<R, FailureReason>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(endpoint)
        .bearer_auth(credential)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            warn!(provider, error = %e, timeout = e.is_timeout(), "Provider request failed");
            FailureReason::TransportError
        })?;

    let status = response.status();
    if let Some(reason) = classify_status(status) {
        let detail = response.text().await.unwrap_or_default();
        warn!(
            provider,
            %status,
            %reason,
            detail = %detail.chars().take(200).collect::<String>(),
            "Provider returned an error status"
        );
        return Err(reason);
    }

    response.json::<R>().await.map_err(|e| {
        warn!(provider, error = %e, "Provider response could not be decoded");
        FailureReason::EmptyResponse
    })
}

/// Accepts a completion only if it holds non-whitespace text.
pub(crate) fn non_empty(text: Option<String>) -> Result<String, FailureReason> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(FailureReason::EmptyResponse),
    }
}
