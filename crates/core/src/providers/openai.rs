//! Chat-completions endpoints that follow the OpenAI wire format (OpenAI, Groq).

use super::{ChatProvider, ChatRequest, FailureReason, ProviderConfig, non_empty, post_json};
use crate::conversation::Role;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// An implementation of `ChatProvider` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client,
    config: ProviderConfig,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// The endpoint in `config` must be the full chat-completions URL.
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

fn wire_messages(request: &ChatRequest) -> Vec<WireMessage<'_>> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    if let Some(system) = &request.system {
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(request.history.iter().map(|turn| WireMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        },
        content: &turn.content,
    }));
    messages.push(WireMessage {
        role: "user",
        content: &request.message,
    });
    messages
}

#[async_trait]
impl ChatProvider for OpenAICompatibleClient {
    fn name(&self) -> &str {
        self.config.name()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, FailureReason> {
        let credential = self
            .config
            .credential()
            .ok_or(FailureReason::Unauthenticated)?;

        let body = CompletionRequest {
            model: &self.config.model,
            messages: wire_messages(request),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.or(self.config.max_tokens),
        };
        debug!(provider = self.name(), model = %self.config.model, "Sending chat completion request");

        let response: CompletionResponse =
            post_json(&self.client, self.name(), &self.config.endpoint, credential, &body).await?;

        non_empty(
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }
}
