//! Jarvis Assistant Library Crate
//!
//! This library holds the runtime side of the assistant: configuration
//! loading, the JSON chat log, the desktop collaborators that actually open
//! applications and URLs, and the session that wires them to the core. The
//! `jarvis` binary is a thin wrapper around this library.

pub mod chat_log;
pub mod config;
pub mod desktop;
pub mod session;
