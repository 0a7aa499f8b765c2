//! Wires configuration into the classifier, answer engine and dispatcher,
//! and runs one query at a time through them.

use crate::chat_log::JsonChatLog;
use crate::config::Config;
use crate::desktop::{SystemApps, SystemBrowser, SystemKeys};
use jarvis_core::classifier::CommandClassifier;
use jarvis_core::command::Verb;
use jarvis_core::conversation::{ConversationLog, ConversationStore};
use jarvis_core::dispatcher::{CommandResult, Dispatcher, ExecutionMode};
use jarvis_core::engine::AnswerEngine;
use jarvis_core::handlers::{
    ActionHandler, AppControl, Browser, ChatMode, CloseAppHandler, ContentHandler,
    ConversationHandler, ExitHandler, GoogleSearchHandler, KeyPresser, OpenAppHandler,
    PlayHandler, Persona, SystemHandler, VideoFinder, YoutubeFinder, YoutubeSearchHandler,
};
use jarvis_core::providers::{ChatProvider, ProviderKind, build_providers};
use jarvis_core::rate_limit::RateLimiter;
use std::sync::Arc;
use std::io::BufRead;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, instrument, warn};

/// The desktop side effects handlers are allowed to perform.
#[derive(Clone)]
pub struct Collaborators {
    pub apps: Arc<dyn AppControl>,
    pub browser: Arc<dyn Browser>,
    pub keys: Arc<dyn KeyPresser>,
    pub videos: Arc<dyn VideoFinder>,
}

impl Collaborators {
    pub fn system(config: &Config) -> Self {
        let timeout = config
            .provider(ProviderKind::Cohere)
            .map(|p| p.timeout)
            .unwrap_or(jarvis_core::providers::DEFAULT_REQUEST_TIMEOUT);
        Self {
            apps: Arc::new(SystemApps),
            browser: Arc::new(SystemBrowser),
            keys: Arc::new(SystemKeys),
            videos: Arc::new(YoutubeFinder::new(timeout)),
        }
    }
}

/// What one line of input produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub results: Vec<CommandResult>,
    /// True when the classifier recognized a request to end the session.
    pub exit_requested: bool,
}

pub struct Assistant {
    classifier: CommandClassifier,
    dispatcher: Dispatcher,
    engine: Arc<AnswerEngine>,
}

impl Assistant {
    /// Assembles the assistant from configuration. Providers without
    /// credentials are disabled with a warning; the rest of the session
    /// still works.
    pub async fn new(config: &Config, collaborators: Collaborators, mode: ExecutionMode) -> Self {
        let providers = build_providers(&config.providers);
        let decision_model = decision_model(&providers, config.classifier_provider);
        Self::with_providers(
            config,
            providers,
            decision_model,
            collaborators,
            mode,
        )
        .await
    }

    /// Assembles the assistant around already-built providers, in priority order.
    pub async fn with_providers(
        config: &Config,
        providers: Vec<Arc<dyn ChatProvider>>,
        decision_model: Option<Arc<dyn ChatProvider>>,
        collaborators: Collaborators,
        mode: ExecutionMode,
    ) -> Self {
        let mut limiter = RateLimiter::new(config.min_call_interval);
        for provider in &config.providers {
            limiter = limiter.with_limit(
                provider.name(),
                provider.kind.rate_limit(config.min_call_interval),
            );
        }
        let limiter = Arc::new(limiter);

        let engine = Arc::new(AnswerEngine::new(providers, limiter.clone(), config.retry));
        if engine.provider_names().is_empty() {
            warn!("No provider credentials configured; conversational answers are unavailable");
        } else {
            info!(providers = ?engine.provider_names(), "Answer engine ready");
        }
        let classifier = CommandClassifier::new(decision_model, limiter);

        let store: Arc<dyn ConversationStore> = Arc::new(JsonChatLog::new(&config.chat_log_path));
        let history = match store.load().await {
            Ok(log) => log,
            Err(e) => {
                warn!(error = %e, "Chat log could not be loaded; starting fresh");
                ConversationLog::new()
            }
        };
        let log = Arc::new(Mutex::new(history));
        let persona = Persona::new(&config.username, &config.assistant_name);

        let conversation = |mode: ChatMode| -> Arc<dyn ActionHandler> {
            Arc::new(
                ConversationHandler::new(engine.clone(), log.clone(), persona.clone(), mode)
                    .with_store(store.clone())
                    .with_history_window(config.history_window),
            )
        };

        let Collaborators {
            apps,
            browser,
            keys,
            videos,
        } = collaborators;
        let dispatcher = Dispatcher::new()
            .register(Verb::Open, Arc::new(OpenAppHandler::new(apps.clone())))
            .register(Verb::Close, Arc::new(CloseAppHandler::new(apps)))
            .register(Verb::Play, Arc::new(PlayHandler::new(browser.clone(), videos)))
            .register(
                Verb::Content,
                Arc::new(ContentHandler::new(engine.clone(), browser.clone(), &config.data_dir)),
            )
            .register(Verb::GoogleSearch, Arc::new(GoogleSearchHandler::new(browser.clone())))
            .register(Verb::YoutubeSearch, Arc::new(YoutubeSearchHandler::new(browser)))
            .register(Verb::System, Arc::new(SystemHandler::new(keys)))
            .register(Verb::General, conversation(ChatMode::General))
            .register(Verb::Realtime, conversation(ChatMode::Realtime))
            .register(
                Verb::Exit,
                Arc::new(ExitHandler::new(format!(
                    "Goodbye, {}. Have a great day!",
                    config.username
                ))),
            )
            .with_mode(mode);

        Self {
            classifier,
            dispatcher,
            engine,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.engine.provider_names()
    }

    /// Classifies one line and executes every resulting command.
    #[instrument(name = "turn", skip_all)]
    pub async fn respond(&self, line: &str) -> Turn {
        let batch = self.classifier.classify(line).await;
        info!(commands = ?batch.iter().map(ToString::to_string).collect::<Vec<_>>(), "Query classified");
        let exit_requested = batch.iter().any(|c| c.verb == Verb::Exit);
        let results = self.dispatcher.execute(&batch).await;
        Turn {
            results,
            exit_requested,
        }
    }

    /// Reads lines from stdin until `exit`/`quit`, end of input, or an exit command.
    pub async fn run_interactive(&self, username: &str) -> anyhow::Result<()> {
        self.run_lines(spawn_stdin_reader(), tokio::io::stdout(), username)
            .await
    }

    /// The interactive loop over any line source and output.
    pub async fn run_lines<W>(
        &self,
        mut lines: mpsc::Receiver<String>,
        mut out: W,
        username: &str,
    ) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            out.write_all(format!("{} : ", username).as_bytes()).await?;
            out.flush().await?;

            let Some(line) = lines.recv().await else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_quit(line) {
                break;
            }

            let turn = self.respond(line).await;
            out.write_all(render(&turn.results).as_bytes()).await?;
            out.flush().await?;
            if turn.exit_requested {
                break;
            }
        }
        Ok(())
    }
}

/// The engine's first enabled provider of the configured decision kind.
pub fn decision_model(
    providers: &[Arc<dyn ChatProvider>],
    kind: ProviderKind,
) -> Option<Arc<dyn ChatProvider>> {
    providers.iter().find(|p| p.name() == kind.name()).cloned()
}

/// Reads stdin on a plain thread so a pending read never holds up runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// `exit` or `quit` typed on its own, in any case.
pub fn is_quit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// One line per result, failures prefixed so they stand out.
pub fn render(results: &[CommandResult]) -> String {
    results
        .iter()
        .map(|result| match result {
            Ok(status) => format!("{}\n", status),
            Err(message) => format!("[error] {}\n", message),
        })
        .collect()
}
