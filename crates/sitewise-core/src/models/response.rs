use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProjectStatus;

/// Incoming natural-language request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorRequest {
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub context: RequestContext,
}

impl OrchestratorRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_project(mut self, project_name: impl Into<String>) -> Self {
        self.context.project_name = Some(project_name.into());
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.context.skip_confirmation = true;
        self
    }
}

/// Caller-supplied overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Bypasses project resolution entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Explicit consent for delete/merge/rename
    #[serde(default)]
    pub skip_confirmation: bool,

    #[serde(default)]
    pub skip_duplicate_check: bool,
}

/// Reply returned to the conversational front-end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorResponse {
    pub success: bool,
    pub message: String,
    pub artifacts: Vec<Artifact>,
    pub thought_steps: Vec<TraceStep>,
    pub metadata: ResponseMetadata,
}

impl OrchestratorResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            artifacts: Vec::new(),
            thought_steps: Vec::new(),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, ..Self::success(message) }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_error_code(mut self, code: &str) -> Self {
        self.metadata.error_code = Some(code.to_string());
        self
    }

    pub fn awaiting_confirmation(mut self) -> Self {
        self.metadata.requires_confirmation = true;
        self
    }
}

/// Response metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub execution_time_ms: u64,

    #[serde(default)]
    pub tools_used: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_status: Option<ProjectStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    #[serde(default)]
    pub requires_confirmation: bool,

    /// Strategy that produced the reply after a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<String>,
}

/// Structured payload rendered by the front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: String,

    pub data: Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ArtifactAction>,
}

impl Artifact {
    pub fn new(artifact_type: impl Into<String>, data: Value) -> Self {
        Self { artifact_type: artifact_type.into(), data, actions: Vec::new() }
    }
}

/// Follow-up action offered alongside an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactAction {
    pub label: String,
    pub query: String,
    pub icon: String,
    #[serde(default)]
    pub primary: bool,
}

impl ArtifactAction {
    pub fn new(label: impl Into<String>, query: impl Into<String>, icon: &str) -> Self {
        Self { label: label.into(), query: query.into(), icon: icon.to_string(), primary: false }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Status of an orchestration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Complete,
    Error,
    Skipped,
}

/// Trace record for one orchestration step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub step: u32,
    pub action: String,
    pub reasoning: String,
    pub status: TraceStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request: OrchestratorRequest = serde_json::from_str(
            r#"{"query":"analyze terrain","sessionId":"s-1","context":{"project_name":"abilene-wind-farm"}}"#,
        )
        .unwrap();

        assert_eq!(request.session_id.as_deref(), Some("s-1"));
        assert_eq!(request.context.project_name.as_deref(), Some("abilene-wind-farm"));
        assert!(!request.context.skip_confirmation);
    }

    #[test]
    fn test_response_uses_camel_case() {
        let response = OrchestratorResponse::failure("nope").with_error_code("PROJECT_NOT_FOUND");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("thoughtSteps").is_some());
        assert_eq!(json["metadata"]["errorCode"], "PROJECT_NOT_FOUND");
    }
}
