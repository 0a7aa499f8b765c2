//! Main Entrypoint for the Jarvis Assistant
//!
//! This binary is responsible for:
//! 1. Parsing the command line and loading configuration.
//! 2. Initializing logging on stderr, leaving stdout for replies.
//! 3. Assembling the assistant with the desktop collaborators.
//! 4. Answering a one-shot query, or running the interactive loop until
//!    the user leaves or presses `Ctrl+C`.

use anyhow::Context;
use clap::Parser;
use jarvis_assistant::{
    config::Config,
    session::{Assistant, Collaborators, render},
};
use jarvis_core::dispatcher::ExecutionMode;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "A text assistant that classifies requests and acts on them",
    after_help = "Volume commands (mute, unmute, volume up, volume down) need a build with \
                  `--features media-keys`; without it they report an error."
)]
struct Args {
    /// Read configuration from this file instead of `./.env`.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Run the commands of one request concurrently.
    #[arg(long)]
    concurrent: bool,

    /// Answer this request and exit instead of starting the interactive loop.
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

/// Resolves once `Ctrl+C` is pressed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Exiting...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let config = match &args.env_file {
        Some(path) => Config::from_env_file(path),
        None => Config::from_env(),
    }
    .context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Assemble the Assistant ---
    let mode = if args.concurrent {
        ExecutionMode::Concurrent
    } else {
        ExecutionMode::Sequential
    };
    let assistant = Assistant::new(&config, Collaborators::system(&config), mode).await;
    info!(
        assistant = %config.assistant_name,
        providers = ?assistant.provider_names(),
        classifier = config.classifier_provider.name(),
        ?mode,
        "Assistant configured"
    );

    // --- 4. Answer ---
    if !args.query.is_empty() {
        let turn = assistant.respond(&args.query.join(" ")).await;
        print!("{}", render(&turn.results));
        return Ok(());
    }

    tokio::select! {
        result = assistant.run_interactive(&config.username) => result?,
        _ = shutdown_signal() => {}
    }
    info!("Session ended.");
    Ok(())
}
