//! Decision layer: turns a raw utterance into a batch of normalized commands.

use crate::command::{Command, CommandBatch};
use crate::conversation::ChatMessage;
use crate::providers::{ChatProvider, ChatRequest};
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Classification calls made for one query before falling back to `general`.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

const DECISION_TEMPERATURE: f32 = 0.3;

const DECISION_GRAMMAR: &str = "\
You are a very accurate Decision-Making Model which decides what kind of query is given to you.
Do not answer the query; only decide what kind of query it is and reply with commands.
-> Reply 'general (query)' if the query can be answered by a language model, e.g. 'general who was akbar?'.
-> Reply 'realtime (query)' if the query needs up-to-date information, e.g. 'realtime who is the current president?'.
-> Reply 'open (application name or website name)' to open something, e.g. 'open facebook'.
-> Reply 'close (application name)' to close something, e.g. 'close notepad'.
-> Reply 'play (song name)' to play a song, e.g. 'play let her go'.
-> Reply 'content (topic)' to write content such as an application, essay, code or email.
-> Reply 'google search (topic)' to search a topic on google.
-> Reply 'youtube search (topic)' to search a topic on youtube.
-> Reply 'system (task)' for 'mute', 'unmute', 'volume up' or 'volume down'.
-> Reply 'exit' if the user says goodbye or wants to end the conversation.
*** Replace (query), (topic) and every other placeholder with the actual text from the query. ***
*** If the query asks for multiple tasks, separate the commands with commas, e.g. 'open facebook, close telegram'. ***
*** If you are unsure, reply 'general (query)'. ***";

fn exemplar_history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("how are you?"),
        ChatMessage::assistant("general how are you?"),
        ChatMessage::user("open chrome and tell me about mahatma gandhi."),
        ChatMessage::assistant("open chrome, general tell me about mahatma gandhi."),
        ChatMessage::user("bye jarvis."),
        ChatMessage::assistant("exit"),
    ]
}

/// Parses a decision-model reply into commands.
///
/// Newlines are stripped, the reply is split on commas and every fragment
/// that starts with a recognized verb is kept. When nothing survives, the
/// whole stripped reply becomes a single `general` command.
pub fn parse_reply(reply: &str) -> CommandBatch {
    let stripped = reply.replace(['\r', '\n'], "");
    let stripped = stripped.trim();

    let commands: CommandBatch = stripped
        .split(',')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .filter_map(Command::parse)
        .collect();

    if commands.is_empty() {
        vec![Command::general(stripped)]
    } else {
        commands
    }
}

/// Classifies utterances with one designated provider.
pub struct CommandClassifier {
    provider: Option<Arc<dyn ChatProvider>>,
    limiter: Arc<RateLimiter>,
    max_attempts: usize,
}

impl CommandClassifier {
    /// `provider` is `None` when the decision model has no credential; every
    /// classification then yields a single `error` command.
    pub fn new(provider: Option<Arc<dyn ChatProvider>>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            provider,
            limiter,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[instrument(name = "classify", skip_all)]
    pub async fn classify(&self, query: &str) -> CommandBatch {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let Some(provider) = &self.provider else {
            warn!("Classification requested but no decision model is configured");
            return vec![Command::error("decision model is not configured")];
        };

        let request = ChatRequest::new(query)
            .with_system(DECISION_GRAMMAR)
            .with_history(exemplar_history())
            .with_temperature(DECISION_TEMPERATURE);

        for attempt in 1..=self.max_attempts {
            self.limiter.acquire(provider.name()).await;
            let reply = match provider.complete(&request).await {
                Ok(reply) => reply,
                Err(reason) => {
                    warn!(provider = provider.name(), %reason, "Classification call failed");
                    return vec![Command::error(format!(
                        "classification failed ({}): {}",
                        provider.name(),
                        reason
                    ))];
                }
            };

            let batch = parse_reply(&reply);
            if !batch.iter().any(Command::has_placeholder) {
                debug!(attempt, commands = batch.len(), "Query classified");
                return batch;
            }
            warn!(attempt, reply = %reply, "Decision reply kept a placeholder; classifying again");
        }

        warn!(attempts = self.max_attempts, "Classification never settled; treating as general");
        vec![Command::general(query)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Verb;
    use crate::providers::{FailureReason, MockChatProvider};
    use crate::testing::ScriptedProvider;
    use std::time::Duration;

    fn classifier(provider: Arc<ScriptedProvider>) -> CommandClassifier {
        CommandClassifier::new(
            Some(provider as Arc<dyn ChatProvider>),
            Arc::new(RateLimiter::new(Duration::ZERO)),
        )
    }

    fn rendered(batch: &CommandBatch) -> Vec<String> {
        batch.iter().map(Command::to_string).collect()
    }

    #[test]
    fn test_parse_reply_keeps_recognized_fragments_in_order() {
        let batch = parse_reply("open chrome,\n generate image of a cat, general tell me a joke");
        assert_eq!(rendered(&batch), vec!["open chrome", "general tell me a joke"]);
    }

    #[test]
    fn test_parse_reply_falls_back_to_general() {
        let batch = parse_reply("I think you want\n to know the weather");
        assert_eq!(
            batch,
            vec![Command::general("I think you want to know the weather")]
        );
    }

    #[test]
    fn test_parse_reply_ignores_empty_fragments() {
        let batch = parse_reply("open notepad,, ,close notepad,");
        assert_eq!(rendered(&batch), vec!["open notepad", "close notepad"]);
    }

    #[tokio::test]
    async fn test_multi_intent_query_keeps_relative_order() {
        let provider = ScriptedProvider::always("cohere", Ok("open notepad, youtube search cats".into()));
        let batch = classifier(provider)
            .classify("open notepad and youtube search cats")
            .await;

        let open = batch
            .iter()
            .position(|c| c.verb == Verb::Open && c.argument == "notepad")
            .expect("open notepad");
        let search = batch
            .iter()
            .position(|c| c.verb == Verb::YoutubeSearch && c.argument == "cats")
            .expect("youtube search cats");
        assert!(open < search);
    }

    #[tokio::test]
    async fn test_already_normalized_command_is_stable() {
        let provider = ScriptedProvider::always("cohere", Ok("general hello".into()));
        let batch = classifier(provider).classify("general hello").await;
        assert_eq!(rendered(&batch), vec!["general hello"]);
    }

    #[tokio::test]
    async fn test_request_carries_grammar_and_exemplars() {
        let provider = ScriptedProvider::always("cohere", Ok("general hi".into()));
        classifier(provider.clone()).classify("  hi  ").await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.message, "hi");
        assert_eq!(request.temperature, Some(DECISION_TEMPERATURE));
        assert!(request.system.as_deref().unwrap().contains("Decision-Making Model"));
        assert_eq!(request.history[0], ChatMessage::user("how are you?"));
        assert_eq!(request.history[1], ChatMessage::assistant("general how are you?"));
    }

    #[tokio::test]
    async fn test_placeholder_echo_triggers_reclassification() {
        let provider = ScriptedProvider::scripted(
            "cohere",
            vec![
                Ok("general (query)".into()),
                Ok("realtime who won the match yesterday".into()),
            ],
        );
        let batch = classifier(provider.clone())
            .classify("who won the match yesterday")
            .await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(
            batch,
            vec![Command::new(Verb::Realtime, "who won the match yesterday")]
        );
    }

    #[tokio::test]
    async fn test_persistent_placeholder_is_bounded() {
        let provider = ScriptedProvider::always("cohere", Ok("general (query), open (query)".into()));
        let batch = classifier(provider.clone())
            .with_max_attempts(4)
            .classify("tell me something")
            .await;

        assert_eq!(provider.calls(), 4);
        assert_eq!(batch, vec![Command::general("tell me something")]);
    }

    fn mock_classifier(provider: MockChatProvider) -> CommandClassifier {
        CommandClassifier::new(
            Some(Arc::new(provider)),
            Arc::new(RateLimiter::new(Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_command() {
        let mut provider = MockChatProvider::new();
        provider.expect_name().return_const("cohere".to_string());
        provider
            .expect_complete()
            .withf(|request| request.message == "open spotify")
            .times(1)
            .returning(|_| Err(FailureReason::RateLimited));
        let batch = mock_classifier(provider).classify("open spotify").await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].verb, Verb::Error);
        assert!(batch[0].argument.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_missing_provider_becomes_error_command() {
        let classifier = CommandClassifier::new(None, Arc::new(RateLimiter::new(Duration::ZERO)));
        let batch = classifier.classify("open spotify").await;
        assert_eq!(batch, vec![Command::error("decision model is not configured")]);
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_call() {
        let mut provider = MockChatProvider::new();
        provider.expect_name().return_const("cohere".to_string());
        provider.expect_complete().never();
        let batch = mock_classifier(provider).classify("   ").await;
        assert!(batch.is_empty());
    }
}
