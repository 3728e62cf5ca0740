//! Reply text, artifacts, and follow-up actions for completed analyses

use serde_json::{json, Value};
use sitewise_core::models::{
    Artifact, ArtifactAction, CapabilityResponse, IntentType, ProjectRecord, ProjectSummary, Stage,
};

use crate::guidance::LIST_PROJECTS_QUERY;

/// Artifact type for an analysis intent when the capability names none
pub fn default_artifact_type(kind: IntentType) -> &'static str {
    match kind {
        IntentType::TerrainAnalysis => "wind_farm_terrain_analysis",
        IntentType::LayoutOptimization => "wind_farm_layout",
        IntentType::WakeSimulation => "wake_simulation",
        IntentType::WindRose => "wind_rose_analysis",
        IntentType::ReportGeneration => "wind_farm_report",
        IntentType::FinancialAnalysis => "financial_analysis",
        _ => "project_info",
    }
}

fn stage_action(stage: Stage, project: &str) -> ArtifactAction {
    match stage {
        Stage::Terrain => ArtifactAction::new("Analyze terrain", format!("analyze terrain for {}", project), "map"),
        Stage::Layout => ArtifactAction::new("Optimize layout", format!("optimize layout for {}", project), "grid"),
        Stage::Simulation => {
            ArtifactAction::new("Run wake simulation", format!("run wake simulation for {}", project), "wind")
        }
        Stage::Report => ArtifactAction::new("Generate report", format!("generate report for {}", project), "file"),
    }
}

/// Follow-up actions for the stage just completed, skipping stages the
/// project already has; the first suggestion is primary.
pub fn follow_up_actions(kind: IntentType, project: &ProjectRecord) -> Vec<ArtifactAction> {
    let name = project.project_name.as_str();
    let pending = |stage: Stage| !project.has_stage(stage);

    let mut actions: Vec<ArtifactAction> = match kind {
        IntentType::TerrainAnalysis => Stage::ALL[1..]
            .iter()
            .copied()
            .filter(|s| pending(*s))
            .take(1)
            .map(|s| stage_action(s, name))
            .collect(),
        IntentType::LayoutOptimization => {
            let mut actions: Vec<ArtifactAction> = [Stage::Simulation, Stage::Report]
                .into_iter()
                .filter(|s| pending(*s))
                .take(1)
                .map(|s| stage_action(s, name))
                .collect();
            actions.push(ArtifactAction::new(
                "Wind rose",
                format!("show wind rose for {}", name),
                "compass",
            ));
            actions
        }
        IntentType::WakeSimulation | IntentType::WindRose => {
            let mut actions = Vec::new();
            if pending(Stage::Report) {
                actions.push(stage_action(Stage::Report, name));
            }
            actions.push(ArtifactAction::new(
                "Financial analysis",
                format!("run financial analysis for {}", name),
                "dollar",
            ));
            actions
        }
        IntentType::ReportGeneration | IntentType::FinancialAnalysis => vec![
            ArtifactAction::new("View dashboard", "show my project dashboard", "dashboard"),
            ArtifactAction::new("Export project", format!("export project {}", name), "download"),
        ],
        _ => vec![ArtifactAction::new("List projects", LIST_PROJECTS_QUERY, "list")],
    };

    if let Some(first) = actions.first_mut() {
        first.primary = true;
    }
    actions
}

/// Reply text for a completed analysis
pub fn completion_message(kind: IntentType, project: &ProjectRecord) -> String {
    let name = &project.project_name;
    let next = follow_up_actions(kind, project)
        .into_iter()
        .find(|a| a.primary)
        .map(|a| format!("\n\nNext: \"{}\"", a.query))
        .unwrap_or_default();

    let location = project
        .coordinates
        .map(|c| format!(" at {}", c))
        .unwrap_or_default();

    let headline = match kind {
        IntentType::TerrainAnalysis => format!("Terrain analysis complete for {}{}.", name, location),
        IntentType::LayoutOptimization => format!("Layout optimization complete for {}.", name),
        IntentType::WakeSimulation => format!("Wake simulation complete for {}.", name),
        IntentType::WindRose => format!("Wind rose analysis complete for {}.", name),
        IntentType::ReportGeneration => format!("Report generated for {}.", name),
        IntentType::FinancialAnalysis => format!("Financial analysis complete for {}.", name),
        other => format!("{} finished for {}.", other.label(), name),
    };

    format!(
        "{} Project progress: {}% ({}).{}",
        headline,
        project.completion_percentage(),
        project.status,
        next
    )
}

/// Message for an asynchronously dispatched analysis
pub fn dispatched_message(kind: IntentType, project: &str) -> String {
    format!(
        "Started {} for {}. Results will be delivered to this conversation when ready.",
        kind.label(),
        project
    )
}

pub fn project_details_message(project: &ProjectRecord) -> String {
    let stages: Vec<&str> = project.completed_stages().iter().map(Stage::label).collect();
    let mut message = format!(
        "Project '{}': {} ({}% complete)",
        project.project_name,
        project.status,
        project.completion_percentage()
    );
    if let Some(coordinates) = project.coordinates {
        message.push_str(&format!("\nLocation: {}", coordinates));
    }
    message.push_str(&format!(
        "\nCompleted: {}",
        if stages.is_empty() { "nothing yet".to_string() } else { stages.join(", ") }
    ));
    if project.is_archived() {
        message.push_str("\nThis project is archived.");
    }
    if let Some(operation) = &project.metadata.active_operation {
        message.push_str(&format!("\nRunning: {}", operation));
    }
    message
}

pub fn project_list_message(heading: &str, projects: &[ProjectSummary]) -> String {
    if projects.is_empty() {
        return format!("{}: none found.", heading);
    }
    let mut message = format!("{} ({}):", heading, projects.len());
    for project in projects {
        message.push_str(&format!(
            "\n  • {} ({}, {}%)",
            project.project_name, project.status, project.completion_percentage
        ));
    }
    message
}

/// Artifact carrying the capability payload plus project context
pub fn analysis_artifact(kind: IntentType, response: &CapabilityResponse, project: &ProjectRecord) -> Artifact {
    let artifact_type = if response.result_type.is_empty() {
        default_artifact_type(kind).to_string()
    } else {
        response.result_type.clone()
    };

    let mut data = match &response.data {
        Value::Object(map) => Value::Object(map.clone()),
        Value::Null => json!({}),
        other => json!({ "result": other }),
    };
    if let Value::Object(map) = &mut data {
        map.insert("projectName".to_string(), Value::from(project.project_name.clone()));
        map.insert("projectId".to_string(), Value::from(project.project_id.clone()));
    }

    let mut artifact = Artifact::new(artifact_type, data);
    artifact.actions = follow_up_actions(kind, project);
    artifact
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core::models::{Coordinates, ProjectUpdate};

    fn project(stages: &[Stage]) -> ProjectRecord {
        let mut record = ProjectRecord::new("abilene-wind-farm");
        let mut update = ProjectUpdate::new().coordinates(Coordinates::new(32.45, -99.73));
        for stage in stages {
            update = update.stage_result(*stage, json!({}));
        }
        record.apply(update);
        record
    }

    #[test]
    fn test_terrain_suggests_layout() {
        let actions = follow_up_actions(IntentType::TerrainAnalysis, &project(&[Stage::Terrain]));
        assert_eq!(actions.len(), 1);
        assert!(actions[0].primary);
        assert_eq!(actions[0].query, "optimize layout for abilene-wind-farm");
    }

    #[test]
    fn test_suggestions_skip_completed_stages() {
        let actions = follow_up_actions(
            IntentType::TerrainAnalysis,
            &project(&[Stage::Terrain, Stage::Layout]),
        );
        assert_eq!(actions[0].query, "run wake simulation for abilene-wind-farm");
    }

    #[test]
    fn test_simulation_suggests_report_and_financial() {
        let actions = follow_up_actions(
            IntentType::WakeSimulation,
            &project(&[Stage::Terrain, Stage::Layout, Stage::Simulation]),
        );
        let queries: Vec<&str> = actions.iter().map(|a| a.query.as_str()).collect();
        assert_eq!(
            queries,
            vec!["generate report for abilene-wind-farm", "run financial analysis for abilene-wind-farm"]
        );
    }

    #[test]
    fn test_report_suggests_dashboard_and_export() {
        let actions = follow_up_actions(IntentType::ReportGeneration, &project(&Stage::ALL));
        assert_eq!(actions[0].query, "show my project dashboard");
        assert_eq!(actions[1].query, "export project abilene-wind-farm");
    }

    #[test]
    fn test_completion_message_mentions_next_step() {
        let message = completion_message(IntentType::TerrainAnalysis, &project(&[Stage::Terrain]));
        assert!(message.starts_with("Terrain analysis complete for abilene-wind-farm"));
        assert!(message.contains("25%"));
        assert!(message.contains("optimize layout for abilene-wind-farm"));
    }

    #[test]
    fn test_artifact_uses_capability_type() {
        let response = CapabilityResponse {
            success: true,
            result_type: "wind_farm_terrain_analysis".into(),
            data: json!({"features": 12}),
            error: None,
        };
        let artifact =
            analysis_artifact(IntentType::TerrainAnalysis, &response, &project(&[Stage::Terrain]));
        assert_eq!(artifact.artifact_type, "wind_farm_terrain_analysis");
        assert_eq!(artifact.data["features"], 12);
        assert_eq!(artifact.data["projectName"], "abilene-wind-farm");
        assert!(!artifact.actions.is_empty());
    }
}
