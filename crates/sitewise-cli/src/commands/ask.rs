//! One-shot query, plus the reply rendering shared with `chat`

use crate::cli::AskArgs;
use crate::errors;
use crate::output::OutputWriter;
use crate::progress::create_spinner;
use anyhow::Result;
use console::style;
use sitewise_core::models::{OrchestratorRequest, OrchestratorResponse, TraceStatus};
use sitewise_orchestrator::Orchestrator;

pub async fn execute(
    args: AskArgs,
    orchestrator: &Orchestrator,
    session: &str,
    output: &OutputWriter,
    explain: bool,
) -> Result<()> {
    let mut request = OrchestratorRequest::new(args.query.as_str()).with_session(session);
    if let Some(project) = args.project {
        request = request.with_project(project);
    }
    if args.yes {
        request = request.confirmed();
    }
    request.context.skip_duplicate_check = args.skip_duplicate_check;

    let mut response = send(orchestrator, request.clone(), output).await;
    if needs_confirmation(&response) && super::confirm("Proceed?", args.yes, output)? {
        response = send(orchestrator, request.confirmed(), output).await;
    }

    if output.is_json() {
        output.result(&response)?;
    } else if response.success || response.metadata.requires_confirmation {
        render(&response, output, explain);
        if needs_confirmation(&response) {
            output.info("Re-run with --yes to confirm.");
        }
    }

    if !response.success && !response.metadata.requires_confirmation {
        return Err(errors::query_failed(&response).into());
    }
    Ok(())
}

/// Run one request with a spinner
pub(crate) async fn send(
    orchestrator: &Orchestrator,
    request: OrchestratorRequest,
    output: &OutputWriter,
) -> OrchestratorResponse {
    let spinner = create_spinner("Thinking...", output.is_json());
    let response = orchestrator.handle(request).await;
    spinner.finish_and_clear();
    response
}

/// Awaiting a yes/no rather than a numbered duplicate choice
pub(crate) fn needs_confirmation(response: &OrchestratorResponse) -> bool {
    response.metadata.requires_confirmation
        && !response.artifacts.iter().any(|a| a.artifact_type == "duplicate_detection")
}

pub(crate) fn render(response: &OrchestratorResponse, output: &OutputWriter, explain: bool) {
    if response.success && !response.metadata.requires_confirmation {
        output.success(&response.message);
    } else if response.success {
        output.info(&response.message);
    } else {
        output.error(&response.message);
    }

    let metadata = &response.metadata;
    if let Some(project) = &metadata.project_name {
        let status = metadata.project_status.map(|s| s.to_string()).unwrap_or_default();
        output.kv("Project", format!("{} {}", project, style(status).dim()));
    }
    if let Some(fallback) = &metadata.fallback_used {
        output.kv("Answered by", fallback);
    }

    let actions: Vec<_> = response.artifacts.iter().flat_map(|a| &a.actions).collect();
    if !actions.is_empty() {
        output.section("Next steps");
        for action in actions {
            let marker = if action.primary { style("→").green().bold() } else { style("→").dim() };
            println!("  {} {}: sitewise ask \"{}\"", marker, action.label, action.query);
        }
    }

    if explain {
        output.section("Trace");
        for step in &response.thought_steps {
            let status = match step.status {
                TraceStatus::Complete => style("✓").green(),
                TraceStatus::Error => style("✗").red(),
                TraceStatus::Skipped => style("-").dim(),
            };
            println!(
                "  {} {}. {} ({} ms): {}",
                status, step.step, step.action, step.duration_ms, step.reasoning
            );
            if let Some(error) = &step.error {
                println!("       {}", style(error).red());
            }
        }
        output.kv("Execution time", format!("{} ms", metadata.execution_time_ms));
    }
}
