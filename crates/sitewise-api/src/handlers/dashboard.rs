use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use sitewise_orchestrator::Dashboard;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub session_id: Option<String>,
}

pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<Dashboard>, ApiError> {
    let dashboard = state.orchestrator.lifecycle().dashboard(params.session_id.as_deref()).await?;
    Ok(Json(dashboard))
}
