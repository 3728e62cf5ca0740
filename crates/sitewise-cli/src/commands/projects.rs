//! Project management without going through the natural-language router

use super::confirm;
use crate::cli::{ProjectsArgs, ProjectsCommand, SearchArgs};
use crate::errors;
use crate::output::OutputWriter;
use crate::output_types::{duplicate_rows, ProjectRow};
use anyhow::{Context, Result};
use sitewise_core::error::SitewiseError;
use sitewise_core::models::{Coordinates, ProjectRecord};
use sitewise_core::naming::normalize_project_name;
use sitewise_orchestrator::commands::DEFAULT_SEARCH_RADIUS_KM;
use sitewise_orchestrator::{Orchestrator, ProjectExport, SearchFilters};
use std::fs;
use std::path::Path;

pub async fn execute(
    args: ProjectsArgs,
    orchestrator: &Orchestrator,
    session: &str,
    output: &OutputWriter,
) -> Result<()> {
    let lifecycle = orchestrator.lifecycle();

    match args.command {
        ProjectsCommand::List { all } => {
            let projects = lifecycle.list_projects(all).await?;
            output.table(projects.iter().map(ProjectRow::from).collect())?;
        }

        ProjectsCommand::Show { name } => show(orchestrator, &name, output).await?,

        ProjectsCommand::Delete { name, yes } => {
            let confirmed = confirm(&format!("Delete project '{}'?", name), yes, output)?;
            lifecycle.delete_project(&name, confirmed, Some(session)).await?;
            output.success(format!("Deleted project {}", name));
        }

        ProjectsCommand::BulkDelete { pattern, yes } => {
            let matches = lifecycle.preview_bulk_delete(&pattern).await?;
            let prompt = format!("Delete {} projects ({})?", matches.len(), matches.join(", "));
            let confirmed = !matches.is_empty() && confirm(&prompt, yes, output)?;

            let outcome = lifecycle.bulk_delete(&pattern, confirmed, Some(session)).await?;
            if output.is_json() {
                output.result(&outcome)?;
            } else {
                output.success(format!("Deleted {} projects", outcome.deleted.len()));
                for (name, reason) in &outcome.failed {
                    output.warning(format!("{}: {}", name, reason));
                }
            }
        }

        ProjectsCommand::Rename { old, new, yes } => {
            let confirmed = confirm(&format!("Rename '{}' to '{}'?", old, new), yes, output)?;
            let record = lifecycle.rename_project(&old, &new, confirmed, Some(session)).await?;
            output.success(format!("Renamed {} to {}", old, record.project_name));
        }

        ProjectsCommand::Merge { first, second, keep, yes } => {
            let confirmed = confirm(&format!("Merge '{}' and '{}'?", first, second), yes, output)?;
            let record = lifecycle
                .merge_projects(&first, &second, keep.as_deref(), confirmed, Some(session))
                .await?;
            output.success(format!(
                "Merged into {} ({}% complete)",
                record.project_name,
                record.completion_percentage()
            ));
        }

        ProjectsCommand::Archive { name } => {
            let record = lifecycle.archive_project(&name, Some(session)).await?;
            output.success(format!("Archived {}", record.project_name));
        }

        ProjectsCommand::Unarchive { name } => {
            let record = lifecycle.unarchive_project(&name).await?;
            output.success(format!("Restored {}", record.project_name));
        }

        ProjectsCommand::Export { name, output: path } => {
            let export = lifecycle.export_project(&name).await?;
            match path {
                Some(path) => {
                    let document = serde_json::to_string_pretty(&export)?;
                    fs::write(&path, document)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    output.success(format!("Exported {} to {}", export.project.project_name, path.display()));
                }
                None => output.data(&export)?,
            }
        }

        ProjectsCommand::Import { path } => {
            let export = read_export(&path)?;
            let record = lifecycle.import_project(export).await?;
            output.success(format!("Imported as {}", record.project_name));
        }

        ProjectsCommand::Search(search) => {
            let filters = search_filters(search);
            let projects = lifecycle.search_projects(&filters).await?;
            output.table(projects.iter().map(ProjectRow::from).collect())?;
        }

        ProjectsCommand::Duplicates { radius_km } => {
            let groups = lifecycle.duplicate_groups(radius_km).await?;
            if groups.is_empty() && !output.is_json() {
                output.info("No projects sit within the duplicate radius of one another.");
            } else {
                output.table(duplicate_rows(&groups))?;
            }
        }
    }

    Ok(())
}

async fn show(orchestrator: &Orchestrator, name: &str, output: &OutputWriter) -> Result<()> {
    let name = normalize_project_name(name);
    let record = orchestrator
        .store()
        .load(&name)
        .await?
        .ok_or(SitewiseError::ProjectNotFound { name })?;

    if output.is_json() {
        return output.result(&record);
    }
    print_record(&record, output);
    Ok(())
}

fn print_record(record: &ProjectRecord, output: &OutputWriter) {
    output.section(&record.project_name);
    output.kv("Status", format!("{} ({}% complete)", record.status, record.completion_percentage()));
    if let Some(coordinates) = record.coordinates {
        output.kv("Location", coordinates);
    }

    let stages: Vec<&str> = record.completed_stages().iter().map(|s| s.label()).collect();
    output.kv("Completed", if stages.is_empty() { "none".to_string() } else { stages.join(", ") });

    for (key, value) in &record.metadata.metrics {
        output.kv(key, value);
    }
    if let Some(operation) = &record.metadata.active_operation {
        output.kv("Running", operation);
    }
    if let Some(error) = &record.metadata.last_error {
        output.kv("Last error", error);
    }
    if record.is_archived() {
        output.kv("Archived", "yes");
    }
    output.kv("Created", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    output.kv("Updated", record.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn read_export(path: &Path) -> Result<ProjectExport> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| errors::export_unreadable(&path.display().to_string(), &e.to_string()).into())
}

fn search_filters(args: SearchArgs) -> SearchFilters {
    let near = args.lat.zip(args.lon).map(|(lat, lon)| {
        (Coordinates::new(lat, lon), args.radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM))
    });

    SearchFilters {
        name_contains: args.name,
        created_after: args.created_after,
        created_before: args.created_before,
        incomplete_only: args.incomplete,
        archived: Some(args.archived),
        near,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_args() -> SearchArgs {
        SearchArgs {
            name: None,
            lat: None,
            lon: None,
            radius_km: None,
            incomplete: false,
            archived: false,
            created_after: None,
            created_before: None,
        }
    }

    #[test]
    fn test_search_defaults_to_active_projects() {
        let filters = search_filters(search_args());
        assert_eq!(filters.archived, Some(false));
        assert!(filters.near.is_none());
    }

    #[test]
    fn test_search_near_uses_default_radius() {
        let filters = search_filters(SearchArgs { lat: Some(35.0), lon: Some(-101.4), ..search_args() });
        let (center, radius) = filters.near.unwrap();
        assert_eq!(center, Coordinates::new(35.0, -101.4));
        assert_eq!(radius, DEFAULT_SEARCH_RADIUS_KM);
    }
}
