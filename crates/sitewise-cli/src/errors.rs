use console::style;
use serde_json::Value;
use sitewise_core::error::SitewiseError;
use sitewise_core::models::OrchestratorResponse;
use sitewise_orchestrator::Guidance;
use std::fmt;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), context: None, suggestions: Vec::new(), help_command: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }

    /// Machine-readable form for `--json`
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "status": "error",
            "message": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn from_guidance(problem: &str, remedy: &str, next_steps: &[String]) -> CliError {
    let mut error = CliError::new(problem).with_context(remedy);
    for step in next_steps {
        error = error.with_suggestion(format!("sitewise ask \"{}\"", step));
    }
    error
}

/// Lifecycle and store failures, phrased the way the conversational reply would be
pub fn from_sitewise(err: SitewiseError) -> CliError {
    let guidance = Guidance::for_error(&err);
    let error = from_guidance(&guidance.problem, &guidance.remedy, &guidance.next_steps);

    match err {
        SitewiseError::ConfirmationRequired { .. } => {
            error.with_suggestion("Re-run with --yes to confirm").with_help("Run: sitewise projects --help")
        }
        SitewiseError::DeploymentIssue { .. } | SitewiseError::ConfigMissing { .. } => {
            error.with_help("Run: sitewise doctor")
        }
        SitewiseError::ConfigInvalid { key, reason } => invalid_config(&key, &reason),
        _ => error,
    }
}

/// Failed conversational reply; the guidance artifact supplies the suggestions
pub fn query_failed(response: &OrchestratorResponse) -> CliError {
    let guidance = response.artifacts.iter().find(|a| a.artifact_type == "error_guidance");
    match guidance {
        Some(artifact) => {
            let text = |key: &str| artifact.data[key].as_str().unwrap_or_default().to_string();
            let next_steps: Vec<String> = artifact.data["next_steps"]
                .as_array()
                .map(|steps| steps.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            from_guidance(&text("problem"), &text("remedy"), &next_steps)
        }
        None => CliError::new(response.message.clone()),
    }
    .with_help("Run: sitewise ask --help")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check .sitewise/config.toml for syntax errors")
        .with_suggestion("Or check the SITEWISE_* environment variables")
        .with_help("Run: sitewise config")
}

/// Create error for an unreadable export document
pub fn export_unreadable(path: &str, reason: &str) -> CliError {
    CliError::new("Cannot read project export")
        .with_context(format!("The file is not a Sitewise project export.\n\nPath: {}\nReason: {}", path, reason))
        .with_suggestion("Create one with: sitewise projects export <name> -o project.json")
        .with_help("Run: sitewise projects import --help")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(other) => other,
    };
    let error = match error.downcast::<SitewiseError>() {
        Ok(sitewise_error) => return from_sitewise(sitewise_error),
        Err(other) => other,
    };

    let message = format!("{:#}", error);
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.contains("Permission denied") || message.contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check permissions on the store directory")
            .with_suggestion("Or point --store-root at a writable directory")
    } else {
        CliError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_suggests_yes() {
        let err = from_sitewise(SitewiseError::ConfirmationRequired {
            action: "delete abilene".into(),
            prompt: "Delete abilene?".into(),
        });
        assert!(err.suggestions.iter().any(|s| s.contains("--yes")));
    }

    #[test]
    fn test_not_found_suggests_listing() {
        let err = from_sitewise(SitewiseError::ProjectNotFound { name: "west-texas".into() });
        assert!(err.message.contains("west-texas"));
        assert!(err.suggestions.iter().any(|s| s.starts_with("sitewise ask")));
    }

    #[test]
    fn test_from_anyhow_keeps_cli_error() {
        let err = from_anyhow(anyhow::Error::new(CliError::new("boom").with_suggestion("fix it")));
        assert_eq!(err.message, "boom");
        assert_eq!(err.suggestions, vec!["fix it".to_string()]);
    }

    #[test]
    fn test_query_failed_reads_guidance_artifact() {
        let err = SitewiseError::ProjectNotFound { name: "nowhere".into() };
        let response = Guidance::for_error(&err).into_response(&err);

        let cli_error = query_failed(&response);
        assert!(cli_error.message.contains("nowhere"));
        assert!(!cli_error.suggestions.is_empty());
    }
}
