//! User-facing error guidance

use serde::Serialize;
use sitewise_core::error::SitewiseError;
use sitewise_core::models::{Artifact, OrchestratorResponse};

pub const LIST_PROJECTS_QUERY: &str = "list my renewable projects";

/// One-line problem, a remedy, and 1-4 example next queries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    pub problem: String,
    pub remedy: String,
    pub next_steps: Vec<String>,
}

impl Guidance {
    fn new(problem: impl Into<String>, remedy: impl Into<String>, next_steps: Vec<String>) -> Self {
        let mut next_steps = next_steps;
        next_steps.truncate(4);
        Self { problem: problem.into(), remedy: remedy.into(), next_steps }
    }

    /// Guidance for `err`; internal faults get a generic message
    pub fn for_error(err: &SitewiseError) -> Self {
        match err {
            SitewiseError::MissingProjectData { project, missing, next_query } => Self::new(
                format!("Project '{}' has no {} yet.", project, missing),
                "Run the prerequisite analysis first.",
                vec![next_query.clone(), format!("show project {}", project)],
            ),
            SitewiseError::AmbiguousReference { reference, candidates } => Self::new(
                format!("'{}' matches more than one project.", reference),
                "Use the full project name.",
                candidates.iter().map(|c| format!("show project {}", c)).collect(),
            ),
            SitewiseError::ProjectNotFound { name } => Self::new(
                format!("Project '{}' was not found.", name),
                "Check the name against your project list.",
                vec![LIST_PROJECTS_QUERY.to_string(), "show my project dashboard".to_string()],
            ),
            SitewiseError::NameAlreadyExists { name } => Self::new(
                format!("A project named '{}' already exists.", name),
                "Pick a different name or work with the existing project.",
                vec![format!("show project {}", name), LIST_PROJECTS_QUERY.to_string()],
            ),
            SitewiseError::ProjectInProgress { name, operation } => Self::new(
                format!("Project '{}' is still running {}.", name, operation),
                "Wait for the running analysis to finish and try again.",
                vec![format!("show project {}", name)],
            ),
            SitewiseError::ConfirmationRequired { prompt, .. } => Self::new(
                prompt.clone(),
                "Repeat the request with confirmation to proceed.",
                vec![LIST_PROJECTS_QUERY.to_string()],
            ),
            SitewiseError::InvalidCoordinates { .. } => Self::new(
                err.to_string(),
                "Latitude must be within -90..90 and longitude within -180..180.",
                vec!["analyze terrain at 35.067482, -101.395466".to_string()],
            ),
            SitewiseError::InvalidSearchRadius { .. } => Self::new(
                err.to_string(),
                "Use a positive radius in kilometres.",
                vec!["find projects near 35.0, -101.4 within 10 km".to_string()],
            ),
            SitewiseError::InvalidProjectName { .. } => Self::new(
                err.to_string(),
                "Project names use letters, digits and hyphens.",
                vec!["rename my-project to west-texas-wind-farm".to_string()],
            ),
            SitewiseError::InvalidParameters(lines) => Self::new(
                format!("Some parameters are invalid: {}.", lines.join("; ")),
                "Adjust the values and try again.",
                vec![
                    "analyze terrain at 35.067482, -101.395466".to_string(),
                    "optimize layout with 30 MW capacity".to_string(),
                ],
            ),
            SitewiseError::UnsupportedExportVersion { .. } => Self::new(
                err.to_string(),
                "Export the project again from a current installation.",
                vec![LIST_PROJECTS_QUERY.to_string()],
            ),
            SitewiseError::DeploymentIssue { missing, remediation } => Self::new(
                format!("Analysis capabilities are not configured: {}.", missing.join(", ")),
                remediation.clone(),
                vec!["sitewise doctor".to_string()],
            ),
            SitewiseError::CapabilityTimeout { .. } | SitewiseError::Throttled { .. } => Self::new(
                "The analysis service is busy or took too long to respond.",
                "Wait a moment and retry the same request.",
                vec![LIST_PROJECTS_QUERY.to_string()],
            ),
            SitewiseError::CapabilityNotFound { function } => Self::new(
                format!("The analysis function '{}' is not deployed.", function),
                "Check the configured function identifiers.",
                vec!["sitewise doctor".to_string()],
            ),
            SitewiseError::CapabilityFailed { reason, .. } => Self::new(
                format!("The analysis failed: {}.", reason),
                "Check the parameters and retry.",
                vec![LIST_PROJECTS_QUERY.to_string()],
            ),
            SitewiseError::AgentUnavailable { .. }
            | SitewiseError::Storage { .. }
            | SitewiseError::ConfigMissing { .. }
            | SitewiseError::ConfigInvalid { .. }
            | SitewiseError::Io(_)
            | SitewiseError::Serialization(_) => Self::new(
                "Something went wrong while processing your request.",
                "Please try again in a moment.",
                vec![LIST_PROJECTS_QUERY.to_string()],
            ),
        }
    }

    pub fn render(&self) -> String {
        let mut message = format!("{}\n\n{}", self.problem, self.remedy);
        if !self.next_steps.is_empty() {
            message.push_str("\n\nTry:");
            for step in &self.next_steps {
                message.push_str(&format!("\n  • \"{}\"", step));
            }
        }
        message
    }

    /// Failure response carrying the guidance text, error code and artifact
    pub fn into_response(self, err: &SitewiseError) -> OrchestratorResponse {
        let mut response =
            OrchestratorResponse::failure(self.render()).with_error_code(err.code());
        if let Ok(data) = serde_json::to_value(&self) {
            response = response.with_artifact(Artifact::new("error_guidance", data));
        }
        if matches!(err, SitewiseError::ConfirmationRequired { .. }) {
            response = response.awaiting_confirmation();
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_suggests_listing() {
        let guidance = Guidance::for_error(&SitewiseError::ProjectNotFound {
            name: "west-texas-wind-farm".into(),
        });
        assert!(guidance.problem.contains("not found"));
        assert!(guidance.next_steps.contains(&LIST_PROJECTS_QUERY.to_string()));
    }

    #[test]
    fn test_internal_errors_do_not_leak() {
        let err = SitewiseError::storage_permanent("put", "AccessDenied: bucket secret-bucket");
        let rendered = Guidance::for_error(&err).render();
        assert!(!rendered.contains("secret-bucket"));
    }

    #[test]
    fn test_next_steps_capped() {
        let err = SitewiseError::AmbiguousReference {
            reference: "site".into(),
            candidates: (1..=6).map(|i| format!("site-{}", i)).collect(),
        };
        assert_eq!(Guidance::for_error(&err).next_steps.len(), 4);
    }

    #[test]
    fn test_response_carries_code() {
        let err = SitewiseError::MissingProjectData {
            project: "abilene-wind-farm".into(),
            missing: "layout results".into(),
            next_query: "optimize layout for abilene-wind-farm".into(),
        };
        let response = Guidance::for_error(&err).into_response(&err);
        assert!(!response.success);
        assert_eq!(response.metadata.error_code.as_deref(), Some("MISSING_PROJECT_DATA"));
        assert!(response.message.contains("optimize layout for abilene-wind-farm"));
    }
}
