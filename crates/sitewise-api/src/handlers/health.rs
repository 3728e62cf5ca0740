use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use sitewise_core::models::Capability;

use crate::dto::{CapabilityStatus, HealthResponse, ReadinessResponse};
use crate::state::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse::default())
}

pub async fn readiness(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let config = state.orchestrator.capabilities();
    let capabilities = Capability::ALL
        .iter()
        .map(|c| CapabilityStatus {
            capability: c.as_str(),
            function: config.function_for(*c).map(str::to_string),
            required: config.required.contains(c),
        })
        .collect();

    Json(ReadinessResponse {
        ready: config.missing_required().is_empty(),
        capabilities,
        strategies: state.orchestrator.strategy_names(),
    })
}
