use crate::output::OutputWriter;
use crate::output_types::DashboardRow;
use anyhow::Result;
use sitewise_orchestrator::Orchestrator;

pub async fn execute(orchestrator: &Orchestrator, session: &str, output: &OutputWriter) -> Result<()> {
    let dashboard = orchestrator.lifecycle().dashboard(Some(session)).await?;

    if output.is_json() {
        return output.result(&dashboard);
    }

    output.section("Project Dashboard");
    output.table(dashboard.projects.iter().map(DashboardRow::from).collect())?;

    let totals = &dashboard.totals;
    output.kv("Projects", totals.projects);
    output.kv("Completed", totals.completed);
    output.kv("In progress", totals.in_progress);
    if totals.archived > 0 {
        output.kv("Archived", totals.archived);
    }
    if totals.duplicate_groups > 0 {
        output.warning(format!(
            "{} group(s) of projects sit close together; see: sitewise projects duplicates",
            totals.duplicate_groups
        ));
    }
    if let Some(active) = &dashboard.active_project {
        output.kv("Active project", active);
    }
    Ok(())
}
