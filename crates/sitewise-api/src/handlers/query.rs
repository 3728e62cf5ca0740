use std::sync::Arc;

use axum::{extract::State, Json};
use sitewise_core::models::{OrchestratorRequest, OrchestratorResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// Conversational entry point; failures are reported in the body, not the status
pub async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrchestratorRequest>,
) -> Result<Json<OrchestratorResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query must not be empty"));
    }

    tracing::info!(
        query = %request.query,
        session_id = ?request.session_id,
        has_project = request.context.project_name.is_some(),
        "Processing query request"
    );

    Ok(Json(state.orchestrator.handle(request).await))
}
