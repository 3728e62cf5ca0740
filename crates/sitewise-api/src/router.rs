use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness))

        // Conversational entry point
        .route("/api/v1/query", post(handlers::handle_query))

        // Projects
        .route("/api/v1/projects", get(handlers::list_projects))
        .route("/api/v1/projects/geojson", get(handlers::projects_geojson))
        .route("/api/v1/projects/search", get(handlers::search_projects))
        .route("/api/v1/projects/duplicates", get(handlers::find_duplicates))
        .route("/api/v1/projects/import", post(handlers::import_project))
        .route("/api/v1/projects/merge", post(handlers::merge_projects))
        .route("/api/v1/projects/bulk-delete", post(handlers::bulk_delete_projects))
        .route("/api/v1/projects/{name}", get(handlers::get_project).delete(handlers::delete_project))
        .route("/api/v1/projects/{name}/rename", post(handlers::rename_project))
        .route("/api/v1/projects/{name}/archive", post(handlers::archive_project))
        .route("/api/v1/projects/{name}/unarchive", post(handlers::unarchive_project))
        .route("/api/v1/projects/{name}/export", get(handlers::export_project))

        // Dashboard and sessions
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/sessions/{session_id}", delete(handlers::delete_session))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
