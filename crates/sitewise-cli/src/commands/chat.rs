use super::ask::{needs_confirmation, render, send};
use crate::cli::ChatArgs;
use crate::errors::CliError;
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use dialoguer::Input;
use sitewise_core::models::OrchestratorRequest;
use sitewise_orchestrator::Orchestrator;
use uuid::Uuid;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", ":q"];

pub async fn execute(
    args: ChatArgs,
    orchestrator: &Orchestrator,
    session: &str,
    output: &OutputWriter,
    explain: bool,
) -> Result<()> {
    if output.is_json() {
        return Err(CliError::new("Chat is interactive and has no JSON mode")
            .with_suggestion("Use: sitewise ask \"<question>\" --json")
            .into());
    }

    let session = if args.new { format!("cli-{}", Uuid::new_v4()) } else { session.to_string() };

    println!("\n{}", style("Sitewise").bold().underlined());
    println!("{}", style(format!("Session {}. Type 'exit' to leave.", session)).dim());

    loop {
        let line: String = Input::new().with_prompt("you").allow_empty(true).interact_text()?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }

        let request = OrchestratorRequest::new(query).with_session(session.as_str());
        let mut response = send(orchestrator, request.clone(), output).await;
        if needs_confirmation(&response) {
            render(&response, output, false);
            if super::confirm("Proceed?", false, output)? {
                response = send(orchestrator, request.confirmed(), output).await;
            } else {
                output.info("Cancelled.");
                continue;
            }
        }

        render(&response, output, explain);
        println!();
    }

    Ok(())
}
