use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self { status: "ok", service: "sitewise-api" }
    }
}

/// Configured function identifier per capability
#[derive(Debug, Serialize)]
pub struct CapabilityStatus {
    pub capability: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub required: bool,
}

/// Readiness: every required capability configured
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub capabilities: Vec<CapabilityStatus>,
    pub strategies: Vec<&'static str>,
}

/// Delete operation response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

impl DeleteResponse {
    pub fn success(entity: &str, id: &str) -> Self {
        Self { success: true, message: format!("Successfully deleted {} {}", entity, id) }
    }
}
