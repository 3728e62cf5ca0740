use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::DeleteResponse;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    tracing::info!(session_id = %session_id, "Deleting session");
    state.orchestrator.sessions().delete(&session_id).await?;
    Ok(Json(DeleteResponse::success("session", &session_id)))
}
