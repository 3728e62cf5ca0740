//! Sitewise CLI - Command-line interface
//!
//! Runs the orchestrator in-process against the configured store and
//! capability endpoint.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod output_types;
mod progress;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(commands::execute(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let error = errors::from_anyhow(error);
            if json {
                let body = error.to_json();
                eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()));
            } else {
                error.display();
            }
            ExitCode::FAILURE
        }
    }
}
