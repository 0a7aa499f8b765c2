//! Core of the Jarvis assistant: intent classification, the provider chain
//! that answers conversational queries, and the dispatcher that routes
//! classified commands to their action handlers.
//!
//! The crate performs no operating-system side effects itself. Launching
//! applications, opening URLs and pressing media keys are expressed through
//! the collaborator traits in [`handlers`], which the runtime implements.

pub mod classifier;
pub mod command;
pub mod conversation;
pub mod dispatcher;
pub mod engine;
pub mod handlers;
pub mod providers;
pub mod rate_limit;

#[cfg(test)]
mod testing;

pub use classifier::CommandClassifier;
pub use command::{Command, CommandBatch, Verb};
pub use conversation::{ChatMessage, ConversationLog, ConversationStore, Role};
pub use dispatcher::{CommandResult, Dispatcher, ExecutionMode};
pub use engine::{APOLOGY, AnswerEngine, EMPTY_QUERY_PROMPT, EngineError, RetryPolicy};
pub use providers::{ChatProvider, ChatRequest, FailureReason, ProviderConfig, ProviderKind};
pub use rate_limit::{RateLimit, RateLimiter};
