//! Routes classified commands to their action handlers.

use crate::command::{Command, Verb};
use crate::handlers::ActionHandler;
use futures::FutureExt;
use futures::future::join_all;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Outcome of one command: a status string or a failure message.
pub type CommandResult = Result<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One command at a time, in batch order.
    #[default]
    Sequential,
    /// All commands at once; results still come back in batch order.
    Concurrent,
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<Verb, Arc<dyn ActionHandler>>,
    mode: ExecutionMode,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, verb: Verb, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.insert(verb, handler);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Runs every command and returns one result per command, in input order.
    #[instrument(name = "dispatch", skip_all, fields(commands = commands.len(), mode = ?self.mode))]
    pub async fn execute(&self, commands: &[Command]) -> Vec<CommandResult> {
        match self.mode {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(commands.len());
                for command in commands {
                    results.push(self.run(command).await);
                }
                results
            }
            ExecutionMode::Concurrent => join_all(commands.iter().map(|c| self.run(c))).await,
        }
    }

    async fn run(&self, command: &Command) -> CommandResult {
        if command.verb == Verb::Error {
            warn!(%command, "Skipping failed classification");
            return Err(command.argument.clone());
        }
        let Some(handler) = self.handlers.get(&command.verb) else {
            warn!(%command, "No handler registered");
            return Err(format!("No handler for command: {}", command));
        };

        debug!(%command, "Executing command");
        match AssertUnwindSafe(handler.handle(&command.argument))
            .catch_unwind()
            .await
        {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => {
                warn!(%command, error = %format!("{:#}", e), "Command failed");
                Err(format!("{:#}", e))
            }
            Err(_) => {
                error!(%command, "Handler panicked");
                Err(format!("Error executing {}: handler panicked", command))
            }
        }
    }
}
