//! Command implementations

mod ask;
mod chat;
mod config;
mod dashboard;
mod doctor;
mod projects;

use crate::cli::{Cli, Commands};
use crate::config_loader::{build_orchestrator, load_config};
use crate::output::OutputWriter;
use anyhow::Result;
use dialoguer::Confirm;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config = load_config(&cli)?;
    let Cli { explain, session, config: config_path, command, .. } = cli;

    match command {
        Commands::Config => config::execute(&config, &config_path, &output),
        Commands::Doctor(args) => doctor::execute(args, &config, &config_path, &output).await,
        Commands::Ask(args) => {
            let orchestrator = build_orchestrator(&config)?;
            ask::execute(args, &orchestrator, &session, &output, explain).await
        }
        Commands::Chat(args) => {
            let orchestrator = build_orchestrator(&config)?;
            chat::execute(args, &orchestrator, &session, &output, explain).await
        }
        Commands::Projects(args) => {
            let orchestrator = build_orchestrator(&config)?;
            projects::execute(args, &orchestrator, &session, &output).await
        }
        Commands::Dashboard => {
            let orchestrator = build_orchestrator(&config)?;
            dashboard::execute(&orchestrator, &session, &output).await
        }
    }
}

/// `--yes`, else an interactive prompt; never prompts for JSON or unattended runs
pub(crate) fn confirm(prompt: &str, yes: bool, output: &OutputWriter) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if output.is_json() || !console::user_attended() {
        return Ok(false);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
