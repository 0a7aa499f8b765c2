//! Cohere v1 chat endpoint.

use super::{ChatProvider, ChatRequest, FailureReason, ProviderConfig, non_empty, post_json};
use crate::conversation::{ChatMessage, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    chat_history: Vec<CohereTurn<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct CohereTurn<'a> {
    role: &'static str,
    message: &'a str,
}

impl<'a> From<&'a ChatMessage> for CohereTurn<'a> {
    fn from(turn: &'a ChatMessage) -> Self {
        let role = match turn.role {
            Role::User => "USER",
            Role::Assistant => "CHATBOT",
        };
        Self {
            role,
            message: &turn.content,
        }
    }
}

#[derive(Deserialize)]
struct CohereChatResponse {
    text: Option<String>,
    message: Option<CohereMessage>,
}

#[derive(Deserialize)]
struct CohereMessage {
    text: Option<String>,
}

/// An implementation of `ChatProvider` for Cohere's chat API.
pub struct CohereClient {
    client: Client,
    config: ProviderConfig,
}

impl CohereClient {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChatProvider for CohereClient {
    fn name(&self) -> &str {
        self.config.name()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, FailureReason> {
        let credential = self
            .config
            .credential()
            .ok_or(FailureReason::Unauthenticated)?;

        let body = CohereChatRequest {
            model: &self.config.model,
            message: &request.message,
            preamble: request.system.as_deref(),
            chat_history: request.history.iter().map(CohereTurn::from).collect(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.or(self.config.max_tokens),
        };
        debug!(provider = self.name(), model = %self.config.model, "Sending chat request");

        let response: CohereChatResponse =
            post_json(&self.client, self.name(), &self.config.endpoint, credential, &body).await?;

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .or_else(|| response.message.and_then(|m| m.text));
        non_empty(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::{hang_once, respond_once};
    use crate::providers::{ProviderKind, http_client};
    use std::time::Duration;

    fn client_for(endpoint: String) -> CohereClient {
        let mut config = ProviderConfig::new(ProviderKind::Cohere, Some("co-key".into()), 0);
        config.endpoint = endpoint;
        config.timeout = Duration::from_millis(300);
        CohereClient::new(http_client(config.timeout), config)
    }

    #[tokio::test]
    async fn test_extracts_text_and_sends_cohere_shape() {
        let (endpoint, server) = respond_once("200 OK", r#"{"text":"general how are you?"}"#).await;
        let client = client_for(endpoint);

        let request = ChatRequest::new("how are you?")
            .with_system("decide")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("general hi")])
            .with_temperature(0.3);
        let answer = client.complete(&request).await;
        assert_eq!(answer, Ok("general how are you?".to_string()));

        let raw = server.await.unwrap();
        assert!(raw.contains("authorization: Bearer co-key") || raw.contains("Authorization: Bearer co-key"));
        assert!(raw.contains(r#""preamble":"decide""#));
        assert!(raw.contains(r#""role":"CHATBOT""#));
        assert!(raw.contains(r#""model":"command-r-plus""#));
    }

    #[tokio::test]
    async fn test_falls_back_to_nested_message_text() {
        let (endpoint, _server) =
            respond_once("200 OK", r#"{"text":"","message":{"text":"nested"}}"#).await;
        assert_eq!(client_for(endpoint).ask("q").await, Ok("nested".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limited_status() {
        let (endpoint, _server) = respond_once("429 Too Many Requests", "{}").await;
        assert_eq!(
            client_for(endpoint).ask("q").await,
            Err(FailureReason::RateLimited)
        );
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let (endpoint, _server) = respond_once("401 Unauthorized", r#"{"message":"invalid api token"}"#).await;
        assert_eq!(
            client_for(endpoint).ask("q").await,
            Err(FailureReason::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let (endpoint, _server) = respond_once("200 OK", "{}").await;
        assert_eq!(
            client_for(endpoint).ask("q").await,
            Err(FailureReason::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_error() {
        let (endpoint, _server) = hang_once().await;
        assert_eq!(
            client_for(endpoint).ask("q").await,
            Err(FailureReason::TransportError)
        );
    }

    #[tokio::test]
    async fn test_missing_credential_never_calls_out() {
        let config = ProviderConfig::new(ProviderKind::Cohere, None, 0);
        let client = CohereClient::new(http_client(config.timeout), config);
        assert_eq!(client.ask("q").await, Err(FailureReason::Unauthenticated));
    }
}
