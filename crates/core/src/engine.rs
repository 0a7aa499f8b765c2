//! Answers free-form questions through a priority-ordered provider chain.

use crate::providers::{ChatProvider, ChatRequest, FailureReason};
use crate::rate_limit::RateLimiter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Returned to the user when every provider and retry has failed.
pub const APOLOGY: &str = "I'm having trouble connecting to my services. Please try again later.";

/// Returned for an empty or whitespace-only query.
pub const EMPTY_QUERY_PROMPT: &str = "Please provide a valid query.";

/// One failed provider call within a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("{}", EMPTY_QUERY_PROMPT)]
    EmptyQuery,
    #[error("{}", APOLOGY)]
    ExhaustedRetries { failures: Vec<ProviderFailure> },
}

/// How many passes over the provider chain a query gets, and the pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Tries each enabled provider in priority order under the shared rate limiter.
///
/// A provider that reports `Unauthenticated` is skipped for the rest of the
/// engine's lifetime, since a bad credential does not become valid mid-session.
pub struct AnswerEngine {
    providers: Vec<Arc<dyn ChatProvider>>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    revoked: Mutex<HashSet<String>>,
}

impl AnswerEngine {
    /// `providers` must already be sorted by ascending priority rank.
    pub fn new(
        providers: Vec<Arc<dyn ChatProvider>>,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            providers,
            limiter,
            policy,
            revoked: Mutex::new(HashSet::new()),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Answers `query`, or returns a fixed user-facing message on failure.
    pub async fn ask(&self, query: &str) -> String {
        self.complete(&ChatRequest::new(query)).await
    }

    /// Like [`AnswerEngine::ask`] but for a full chat request.
    pub async fn complete(&self, request: &ChatRequest) -> String {
        self.try_complete(request)
            .await
            .unwrap_or_else(|e| e.to_string())
    }

    pub async fn try_ask(&self, query: &str) -> Result<String, EngineError> {
        self.try_complete(&ChatRequest::new(query)).await
    }

    #[instrument(name = "answer_engine", skip_all, fields(query_len = request.message.len()))]
    pub async fn try_complete(&self, request: &ChatRequest) -> Result<String, EngineError> {
        if request.message.trim().is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        let attempts = self.policy.max_retries.max(1);
        let mut failures = Vec::new();

        for attempt in 1..=attempts {
            let mut tried = 0;
            for provider in &self.providers {
                let name = provider.name();
                if self.revoked.lock().await.contains(name) {
                    continue;
                }
                tried += 1;

                self.limiter.acquire(name).await;
                let reason = match provider.complete(request).await {
                    Ok(answer) if !answer.trim().is_empty() => {
                        info!(provider = name, attempt, "Provider answered");
                        return Ok(answer);
                    }
                    Ok(_) => FailureReason::EmptyResponse,
                    Err(reason) => reason,
                };

                warn!(provider = name, attempt, %reason, "Provider failed; falling back");
                if reason == FailureReason::Unauthenticated {
                    self.revoked.lock().await.insert(name.to_string());
                }
                failures.push(ProviderFailure {
                    provider: name.to_string(),
                    reason,
                });
            }

            if tried == 0 {
                break;
            }
            if attempt < attempts {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        error!(failures = failures.len(), "All providers exhausted");
        Err(EngineError::ExhaustedRetries { failures })
    }
}
