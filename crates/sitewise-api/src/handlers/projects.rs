use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use geojson::FeatureCollection;
use sitewise_core::error::SitewiseError;
use sitewise_core::models::{Coordinates, DuplicateGroup, DuplicateMatch, ProjectRecord, ProjectSummary};
use sitewise_core::naming::normalize_project_name;
use sitewise_geo::map::projects_feature_collection;
use sitewise_orchestrator::commands::DEFAULT_SEARCH_RADIUS_KM;
use sitewise_orchestrator::{BulkDeleteOutcome, ProjectExport, SearchFilters};

use crate::dto::{
    BulkDeleteRequest, ConfirmParams, DeleteResponse, DuplicatesParams, ListParams, MergeRequest,
    RenameRequest, SearchParams,
};
use crate::error::ApiError;
use crate::state::AppState;

fn point(lat: Option<f64>, lon: Option<f64>) -> Result<Option<Coordinates>, ApiError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(Coordinates::new(lat, lon))),
        (None, None) => Ok(None),
        _ => Err(ApiError::bad_request("Both lat and lon are required")),
    }
}

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let projects = state.orchestrator.lifecycle().list_projects(params.include_archived).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProjectRecord>, ApiError> {
    let name = normalize_project_name(&name);
    let record = state
        .orchestrator
        .store()
        .load(&name)
        .await?
        .ok_or(SitewiseError::ProjectNotFound { name })?;
    Ok(Json(record))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<DeleteResponse>, ApiError> {
    tracing::info!(project = %name, confirm = params.confirm, "Deleting project");
    state
        .orchestrator
        .lifecycle()
        .delete_project(&name, params.confirm, params.session_id.as_deref())
        .await?;
    Ok(Json(DeleteResponse::success("project", &name)))
}

pub async fn bulk_delete_projects(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteOutcome>, ApiError> {
    tracing::info!(pattern = %request.pattern, confirm = request.confirm, "Bulk deleting projects");
    let outcome = state
        .orchestrator
        .lifecycle()
        .bulk_delete(&request.pattern, request.confirm, request.session_id.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn rename_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<ProjectRecord>, ApiError> {
    tracing::info!(project = %name, new_name = %request.new_name, "Renaming project");
    let record = state
        .orchestrator
        .lifecycle()
        .rename_project(&name, &request.new_name, request.confirm, request.session_id.as_deref())
        .await?;
    Ok(Json(record))
}

pub async fn merge_projects(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> Result<Json<ProjectRecord>, ApiError> {
    tracing::info!(first = %request.first, second = %request.second, "Merging projects");
    let record = state
        .orchestrator
        .lifecycle()
        .merge_projects(
            &request.first,
            &request.second,
            request.keep.as_deref(),
            request.confirm,
            request.session_id.as_deref(),
        )
        .await?;
    Ok(Json(record))
}

pub async fn archive_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ConfirmParams>,
) -> Result<Json<ProjectRecord>, ApiError> {
    let record = state
        .orchestrator
        .lifecycle()
        .archive_project(&name, params.session_id.as_deref())
        .await?;
    Ok(Json(record))
}

pub async fn unarchive_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProjectRecord>, ApiError> {
    let record = state.orchestrator.lifecycle().unarchive_project(&name).await?;
    Ok(Json(record))
}

pub async fn export_project(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProjectExport>, ApiError> {
    let export = state.orchestrator.lifecycle().export_project(&name).await?;
    Ok(Json(export))
}

pub async fn import_project(
    State(state): State<Arc<AppState>>,
    Json(export): Json<ProjectExport>,
) -> Result<(StatusCode, Json<ProjectRecord>), ApiError> {
    tracing::info!(project = %export.project.project_name, version = %export.version, "Importing project");
    let record = state.orchestrator.lifecycle().import_project(export).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn search_projects(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let near = point(params.lat, params.lon)?
        .map(|center| (center, params.radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM)));

    let filters = SearchFilters {
        name_contains: params.name,
        created_after: params.created_after,
        created_before: params.created_before,
        incomplete_only: params.incomplete,
        // Archived projects stay hidden unless asked for
        archived: params.archived.or(Some(false)),
        near,
    };
    let projects = state.orchestrator.lifecycle().search_projects(&filters).await?;
    Ok(Json(projects))
}

/// Projects near a point, or every duplicate group when no point is given
pub async fn find_duplicates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DuplicatesParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let lifecycle = state.orchestrator.lifecycle();
    let body = match point(params.lat, params.lon)? {
        Some(center) => {
            let matches: Vec<DuplicateMatch> = lifecycle.detect_duplicates(&center, params.radius_km).await?;
            serde_json::json!({ "matches": matches })
        }
        None => {
            let groups: Vec<DuplicateGroup> = lifecycle.duplicate_groups(params.radius_km).await?;
            serde_json::json!({ "groups": groups })
        }
    };
    Ok(Json(body))
}

pub async fn projects_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let projects = state.orchestrator.lifecycle().list_projects(params.include_archived).await?;
    Ok(Json(projects_feature_collection(&projects)))
}
