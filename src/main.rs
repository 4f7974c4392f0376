mod cleanup;
mod cli;
mod commands;
mod config;
mod error;
mod executor;
mod items;
mod logging;
mod outcome;
mod retry;
mod review;
mod sink;
mod stats;
mod ui;
mod zai;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use config::SqlReviewConfig;
use error::PipelineError;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

fn failure_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<PipelineError>() {
        Some(err) if err.is_config() => format!("Configuration error: {err}"),
        _ => format!("Error: {e:#}"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SqlReviewConfig::load(cli.config.as_deref())?;

    let phase = match &cli.command {
        Command::Review(_) => "review",
        Command::Clean(_) => "clean",
        Command::Status => "status",
    };
    // Only review runs write a log file.
    let mut log_config = config.logging.clone();
    log_config.file_output &= matches!(cli.command, Command::Review(_));
    if let Some(path) = logging::init(&log_config, config.logs_dir(), phase, cli.verbose)? {
        debug!("Logging to {}", path.display());
    }

    match &cli.command {
        Command::Review(args) => commands::review(&config, args, cli.verbose).await,
        Command::Clean(args) => commands::clean(&config, args),
        Command::Status => commands::status(&config),
    }
}
