//! Invocation port definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitewise_core::error::Result;
use sitewise_core::models::{Artifact, CapabilityRequest, CapabilityResponse, Coordinates};

/// Port for the downstream analysis capabilities
#[async_trait]
pub trait CapabilityInvoker: Send + Sync {
    /// Invoke `function` and wait for its typed result
    async fn invoke(&self, function: &str, request: &CapabilityRequest) -> Result<CapabilityResponse>;

    /// Dispatch `function` without a return channel; results are delivered out of band
    async fn invoke_async(&self, function: &str, request: &CapabilityRequest) -> Result<()>;
}

/// Query forwarded to the intelligent agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub query: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

/// Reply produced by the intelligent agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentReply {
    pub message: String,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default)]
    pub tools_used: Vec<String>,
}

/// Port for a higher-level agent that may answer a query on its own
#[async_trait]
pub trait IntelligentAgent: Send + Sync {
    /// Answer the query.
    ///
    /// Timeouts surface as `CapabilityTimeout` and throttling as `Throttled`;
    /// every other failure is `AgentUnavailable`.
    async fn respond(&self, request: &AgentRequest) -> Result<AgentReply>;
}

/// Port for turning coordinates into a place name
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Nearest locality name, `None` when the service knows nothing useful
    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<Option<String>>;
}
