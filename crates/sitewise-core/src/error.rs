//! Error types for Sitewise

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SitewiseError {
    // Project data errors
    #[error("Project '{project}' has no {missing} yet. Try: {next_query}")]
    MissingProjectData {
        project: String,
        missing: String,
        next_query: String,
    },

    #[error("'{reference}' matches several projects: {}", .candidates.join(", "))]
    AmbiguousReference {
        reference: String,
        candidates: Vec<String>,
    },

    #[error("Project '{name}' not found")]
    ProjectNotFound { name: String },

    #[error("A project named '{name}' already exists")]
    NameAlreadyExists { name: String },

    #[error("Project '{name}' is still running {operation}")]
    ProjectInProgress { name: String, operation: String },

    #[error("Confirmation required to {action}")]
    ConfirmationRequired { action: String, prompt: String },

    // Input constraint errors
    #[error("Invalid coordinates ({latitude}, {longitude}): {reason}")]
    InvalidCoordinates {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    #[error("Invalid search radius {radius_km} km: {reason}")]
    InvalidSearchRadius { radius_km: f64, reason: String },

    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("Invalid parameters: {}", .0.join("; "))]
    InvalidParameters(Vec<String>),

    #[error("Unsupported export format version '{version}' (supported: {supported})")]
    UnsupportedExportVersion { version: String, supported: String },

    // Deployment and capability errors
    #[error("Capabilities not configured: {}. Try: {remediation}", .missing.join(", "))]
    DeploymentIssue {
        missing: Vec<String>,
        remediation: String,
    },

    #[error("Capability '{function}' timed out after {elapsed_ms} ms")]
    CapabilityTimeout { function: String, elapsed_ms: u64 },

    #[error("Capability '{function}' is throttled")]
    Throttled { function: String },

    #[error("Capability '{function}' not found")]
    CapabilityNotFound { function: String },

    #[error("Capability '{function}' failed: {reason}")]
    CapabilityFailed {
        function: String,
        reason: String,
        transient: bool,
    },

    #[error("Agent unavailable: {reason}")]
    AgentUnavailable { reason: String },

    // Storage errors
    #[error("Storage error during {operation}: {reason}")]
    Storage {
        operation: String,
        reason: String,
        transient: bool,
    },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SitewiseError {
    /// Transient storage fault (retried with backoff)
    pub fn storage_transient(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.into(),
            transient: true,
        }
    }

    /// Permanent storage fault (propagated immediately)
    pub fn storage_permanent(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            reason: reason.into(),
            transient: false,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingProjectData { .. } => "MISSING_PROJECT_DATA",
            Self::AmbiguousReference { .. } => "AMBIGUOUS_REFERENCE",
            Self::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            Self::NameAlreadyExists { .. } => "NAME_ALREADY_EXISTS",
            Self::ProjectInProgress { .. } => "PROJECT_IN_PROGRESS",
            Self::ConfirmationRequired { .. } => "CONFIRMATION_REQUIRED",
            Self::InvalidCoordinates { .. } => "INVALID_COORDINATES",
            Self::InvalidSearchRadius { .. } => "INVALID_SEARCH_RADIUS",
            Self::InvalidProjectName { .. } => "INVALID_PROJECT_NAME",
            Self::InvalidParameters(_) => "INVALID_PARAMETERS",
            Self::UnsupportedExportVersion { .. } => "UNSUPPORTED_EXPORT_VERSION",
            Self::DeploymentIssue { .. } => "DEPLOYMENT_ISSUE",
            Self::CapabilityTimeout { .. } => "LAMBDA_TIMEOUT",
            Self::Throttled { .. } => "THROTTLING",
            Self::CapabilityNotFound { .. } => "CAPABILITY_NOT_FOUND",
            Self::CapabilityFailed { .. } => "CAPABILITY_FAILED",
            Self::AgentUnavailable { .. } => "AGENT_UNAVAILABLE",
            Self::Storage { .. } => "S3_ERROR",
            Self::ConfigMissing { .. } | Self::ConfigInvalid { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the failure is transient and the operation may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CapabilityTimeout { .. } | Self::Throttled { .. } => true,
            Self::CapabilityFailed { transient, .. } | Self::Storage { transient, .. } => {
                *transient
            }
            _ => false,
        }
    }

    /// Errors that describe bad user input rather than a system fault
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::Storage { .. }
                | Self::Io(_)
                | Self::Serialization(_)
                | Self::ConfigMissing { .. }
                | Self::ConfigInvalid { .. }
        )
    }
}

impl From<serde_json::Error> for SitewiseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SitewiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SitewiseError::Throttled { function: "terrain".into() }.is_retryable());
        assert!(SitewiseError::CapabilityTimeout { function: "layout".into(), elapsed_ms: 900 }
            .is_retryable());
        assert!(SitewiseError::storage_transient("load", "503 Slow Down").is_retryable());

        assert!(!SitewiseError::storage_permanent("load", "access denied").is_retryable());
        assert!(!SitewiseError::CapabilityNotFound { function: "report".into() }.is_retryable());
        assert!(!SitewiseError::InvalidParameters(vec!["latitude".into()]).is_retryable());
    }

    #[test]
    fn test_codes_match_taxonomy() {
        assert_eq!(
            SitewiseError::ProjectNotFound { name: "x".into() }.code(),
            "PROJECT_NOT_FOUND"
        );
        assert_eq!(
            SitewiseError::CapabilityTimeout { function: "f".into(), elapsed_ms: 1 }.code(),
            "LAMBDA_TIMEOUT"
        );
        assert_eq!(SitewiseError::storage_transient("put", "x").code(), "S3_ERROR");
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = SitewiseError::AmbiguousReference {
            reference: "abilene".into(),
            candidates: vec!["abilene-wind-farm".into(), "abilene-wind-farm-2".into()],
        };
        assert_eq!(
            err.to_string(),
            "'abilene' matches several projects: abilene-wind-farm, abilene-wind-farm-2"
        );
    }
}
