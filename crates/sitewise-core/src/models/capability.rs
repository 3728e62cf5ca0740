use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload sent to a downstream capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityRequest {
    pub parameters: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<Value>,
}

/// Typed result returned by a downstream capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResponse {
    pub success: bool,

    #[serde(rename = "type")]
    pub result_type: String,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
