//! Ordered answer strategies: the intelligent agent first (when configured),
//! then direct capability invocation.

use async_trait::async_trait;
use sitewise_core::error::SitewiseError;
use sitewise_core::models::{OrchestratorRequest, OrchestratorResponse};
use sitewise_invoke::{AgentRequest, IntelligentAgent};
use std::sync::Arc;

use crate::engine::Pipeline;
use crate::trace::TraceRecorder;

/// Outcome of one strategy attempt
#[derive(Debug)]
pub enum StrategyOutcome {
    Complete(OrchestratorResponse),
    /// Try the next strategy; `transient` marks timeouts and throttling
    FallThrough { transient: bool, reason: String },
}

impl StrategyOutcome {
    /// Classify a failure: timeouts and throttling are transient, the rest are not
    pub fn fall_through(err: &SitewiseError) -> Self {
        let transient = matches!(
            err,
            SitewiseError::CapabilityTimeout { .. } | SitewiseError::Throttled { .. }
        );
        Self::FallThrough { transient, reason: err.to_string() }
    }
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> StrategyOutcome;
}

/// Hands the whole query to the intelligent agent
pub struct AgentStrategy {
    agent: Arc<dyn IntelligentAgent>,
}

impl AgentStrategy {
    pub fn new(agent: Arc<dyn IntelligentAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Strategy for AgentStrategy {
    fn name(&self) -> &'static str {
        "intelligent_agent"
    }

    async fn attempt(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> StrategyOutcome {
        trace.begin();
        let agent_request = AgentRequest {
            query: request.query.clone(),
            session_id: request.session_id.clone(),
            project_name: request.context.project_name.clone(),
        };

        match self.agent.respond(&agent_request).await {
            Ok(reply) => {
                trace.complete("Intelligent agent", "Agent answered the query", "answered");
                let mut response = OrchestratorResponse::success(reply.message);
                response.artifacts = reply.artifacts;
                response.metadata.tools_used = reply.tools_used;
                StrategyOutcome::Complete(response)
            }
            Err(e) => {
                let outcome = StrategyOutcome::fall_through(&e);
                let transient = matches!(outcome, StrategyOutcome::FallThrough { transient: true, .. });
                tracing::warn!(error = %e, transient, "Agent failed, falling back to direct invocation");
                trace.error("Intelligent agent", "Agent failed, falling back", e.to_string());
                outcome
            }
        }
    }
}

/// Deterministic route/resolve/validate/invoke pipeline; always completes
pub struct DirectInvocationStrategy {
    pipeline: Arc<Pipeline>,
}

impl DirectInvocationStrategy {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Strategy for DirectInvocationStrategy {
    fn name(&self) -> &'static str {
        "direct_invocation"
    }

    async fn attempt(&self, request: &OrchestratorRequest, trace: &mut TraceRecorder) -> StrategyOutcome {
        StrategyOutcome::Complete(self.pipeline.respond(request, trace).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_through_classification() {
        let timeout = SitewiseError::CapabilityTimeout { function: "agent".into(), elapsed_ms: 30_000 };
        assert!(matches!(
            StrategyOutcome::fall_through(&timeout),
            StrategyOutcome::FallThrough { transient: true, .. }
        ));

        let throttled = SitewiseError::Throttled { function: "agent".into() };
        assert!(matches!(
            StrategyOutcome::fall_through(&throttled),
            StrategyOutcome::FallThrough { transient: true, .. }
        ));

        let down = SitewiseError::AgentUnavailable { reason: "connection refused".into() };
        assert!(matches!(
            StrategyOutcome::fall_through(&down),
            StrategyOutcome::FallThrough { transient: false, .. }
        ));
    }
}
