//! Project Lifecycle Manager
//!
//! Duplicate detection, delete (single and bulk), rename, merge,
//! archive/unarchive, search, export/import, duplicate-choice handling, and
//! the project dashboard. Destructive operations require explicit
//! confirmation and keep the session context in step with the store.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::{
    Coordinates, DuplicateGroup, DuplicateMatch, PendingDuplicateCheck, ProjectRecord,
    ProjectStatus, ProjectSummary, ProjectUpdate, Stage,
};
use sitewise_core::naming::{normalize_project_name, unique_name, validate_project_name};
use sitewise_geo::{find_within_radius, group_by_proximity, validate_search_radius, within_radius};
use sitewise_store::{ProjectStore, SessionContextStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Export format version written and accepted
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

const ARTIFACT_REFERENCE_KEYS: [&str; 3] = ["s3_key", "artifact_key", "url"];

/// Sequential narrowing filters for project search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Substring of the project name
    pub name_contains: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Only projects without a report
    pub incomplete_only: bool,
    /// `Some(true)` archived only, `Some(false)` active only, `None` both
    pub archived: Option<bool>,
    /// Center and radius in kilometres
    pub near: Option<(Coordinates, f64)>,
}

/// Result of a bulk delete
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkDeleteOutcome {
    pub deleted: Vec<String>,
    /// Project name and failure reason
    pub failed: Vec<(String, String)>,
}

/// Portable project document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub project: ProjectRecord,
    /// Keys and URLs of large side-artifacts referenced by stage results
    #[serde(default)]
    pub artifact_references: Vec<String>,
}

/// What to do after the user answered a duplicate prompt
#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateChoiceOutcome {
    /// Reuse the nearest existing project for the suspended query
    ContinueExisting { project: String, query: String },
    /// Run the suspended query as a new project
    CreateNew { query: String },
    /// Show the candidates and ask again
    ShowDetails { candidates: Vec<ProjectSummary>, prompt: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub project_name: String,
    pub status: ProjectStatus,
    pub completion_percentage: u8,
    pub location: Option<Coordinates>,
    pub completed_stages: Vec<Stage>,
    pub is_active: bool,
    pub is_duplicate: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardTotals {
    pub projects: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub archived: usize,
    pub duplicate_groups: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub projects: Vec<DashboardEntry>,
    pub totals: DashboardTotals,
    pub active_project: Option<String>,
}

/// Numbered prompt listing nearby projects for a new-site query
pub fn duplicate_prompt(candidates: &[DuplicateMatch]) -> String {
    let mut prompt = String::from("Found existing projects near this location:\n");
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "\n  {}. {} ({:.2} km away)",
            i + 1,
            candidate.project_name,
            candidate.distance_km
        ));
    }
    prompt.push_str(
        "\n\nReply with:\n  1 to continue with the nearest project\n  2 to create a new project\n  3 to view project details",
    );
    prompt
}

fn artifact_references(record: &ProjectRecord) -> Vec<String> {
    fn collect(value: &Value, found: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::String(s) if ARTIFACT_REFERENCE_KEYS.contains(&key.as_str()) => {
                            found.push(s.clone())
                        }
                        other => collect(other, found),
                    }
                }
            }
            Value::Array(items) => items.iter().for_each(|item| collect(item, found)),
            _ => {}
        }
    }

    let mut found = Vec::new();
    for stage in Stage::ALL {
        if let Some(result) = record.stage_result(stage) {
            collect(result, &mut found);
        }
    }
    found
}

fn confirmation_required(action: String, prompt: String) -> SitewiseError {
    SitewiseError::ConfirmationRequired { action, prompt }
}

pub struct ProjectLifecycleManager {
    store: Arc<ProjectStore>,
    sessions: Arc<SessionContextStore>,
    duplicate_radius_km: f64,
}

impl ProjectLifecycleManager {
    pub fn new(store: Arc<ProjectStore>, sessions: Arc<SessionContextStore>, duplicate_radius_km: f64) -> Self {
        Self { store, sessions, duplicate_radius_km }
    }

    pub fn duplicate_radius_km(&self) -> f64 {
        self.duplicate_radius_km
    }

    async fn require(&self, name: &str) -> Result<ProjectRecord> {
        self.store
            .load(name)
            .await?
            .ok_or_else(|| SitewiseError::ProjectNotFound { name: name.to_string() })
    }

    /// Active projects within `radius_km` (default radius when `None`), nearest first
    pub async fn detect_duplicates(
        &self,
        coordinates: &Coordinates,
        radius_km: Option<f64>,
    ) -> Result<Vec<DuplicateMatch>> {
        let radius_km = validate_search_radius(radius_km.unwrap_or(self.duplicate_radius_km))?;
        coordinates.validate()?;

        let records = self.store.list().await?;
        let sites = records
            .iter()
            .filter(|r| !r.is_archived())
            .filter_map(|r| r.coordinates.map(|c| (r.project_name.as_str(), c)));
        Ok(find_within_radius(coordinates, sites, radius_km))
    }

    /// Every cluster of two or more projects within `radius_km` of one another
    pub async fn duplicate_groups(&self, radius_km: Option<f64>) -> Result<Vec<DuplicateGroup>> {
        let radius_km = validate_search_radius(radius_km.unwrap_or(self.duplicate_radius_km))?;
        let sites: Vec<(String, Coordinates)> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|r| !r.is_archived())
            .filter_map(|r| r.coordinates.map(|c| (r.project_name, c)))
            .collect();
        Ok(group_by_proximity(&sites, radius_km))
    }

    async fn delete_one(&self, name: &str) -> Result<()> {
        let record = self.require(name).await?;
        if let Some(operation) = &record.metadata.active_operation {
            return Err(SitewiseError::ProjectInProgress {
                name: name.to_string(),
                operation: operation.clone(),
            });
        }
        self.store.delete(name).await?;
        Ok(())
    }

    /// Delete one project; refuses unknown, mid-processing, or unconfirmed deletes
    pub async fn delete_project(&self, name: &str, confirmed: bool, session_id: Option<&str>) -> Result<()> {
        let name = normalize_project_name(name);
        let record = self.require(&name).await?;

        if let Some(operation) = &record.metadata.active_operation {
            return Err(SitewiseError::ProjectInProgress { name, operation: operation.clone() });
        }
        if !confirmed {
            return Err(confirmation_required(
                format!("delete project '{}'", name),
                format!("Are you sure you want to delete '{}'? This cannot be undone.", name),
            ));
        }

        self.delete_one(&name).await?;
        if let Some(session_id) = session_id {
            self.sessions.forget_project(session_id, &name).await?;
        }

        tracing::info!(project = %name, "Project deleted");
        Ok(())
    }

    /// Names a bulk delete of `pattern` would remove
    pub async fn preview_bulk_delete(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = normalize_project_name(pattern);
        Ok(self
            .store
            .list_names()
            .await?
            .into_iter()
            .filter(|name| name.contains(&pattern))
            .collect())
    }

    /// Delete every project whose name contains `pattern`, concurrently
    pub async fn bulk_delete(
        &self,
        pattern: &str,
        confirmed: bool,
        session_id: Option<&str>,
    ) -> Result<BulkDeleteOutcome> {
        let matches = self.preview_bulk_delete(pattern).await?;
        if matches.is_empty() {
            return Err(SitewiseError::ProjectNotFound { name: pattern.to_string() });
        }
        if !confirmed {
            return Err(confirmation_required(
                format!("delete {} projects matching '{}'", matches.len(), pattern),
                format!(
                    "This will delete {} projects: {}. Are you sure?",
                    matches.len(),
                    matches.join(", ")
                ),
            ));
        }

        let results = join_all(matches.iter().map(|name| self.delete_one(name))).await;

        let mut outcome = BulkDeleteOutcome::default();
        for (name, result) in matches.into_iter().zip(results) {
            match result {
                Ok(()) => outcome.deleted.push(name),
                Err(e) => {
                    tracing::warn!(project = %name, error = %e, "Bulk delete item failed");
                    outcome.failed.push((name, e.to_string()));
                }
            }
        }

        if let Some(session_id) = session_id {
            let deleted = outcome.deleted.clone();
            self.sessions
                .update(session_id, |s| deleted.iter().for_each(|name| s.forget_project(name)))
                .await?;
        }

        tracing::info!(deleted = outcome.deleted.len(), failed = outcome.failed.len(), "Bulk delete finished");
        Ok(outcome)
    }

    /// Move a project to a new name
    pub async fn rename_project(
        &self,
        old: &str,
        new: &str,
        confirmed: bool,
        session_id: Option<&str>,
    ) -> Result<ProjectRecord> {
        let old = normalize_project_name(old);
        let new = validate_project_name(new)?;

        let mut record = self.require(&old).await?;
        if old == new || self.store.exists(&new).await? {
            return Err(SitewiseError::NameAlreadyExists { name: new });
        }
        if !confirmed {
            return Err(confirmation_required(
                format!("rename '{}' to '{}'", old, new),
                format!("Rename '{}' to '{}'?", old, new),
            ));
        }

        record.project_name = new.clone();
        record.updated_at = Utc::now();
        self.store.put_record(&record).await?;
        self.store.delete(&old).await?;

        if let Some(session_id) = session_id {
            self.sessions.rename_project(session_id, &old, &new).await?;
        }

        tracing::info!(from = %old, to = %new, "Project renamed");
        Ok(record)
    }

    /// Union two projects into the one named `keep` (defaults to `first`)
    pub async fn merge_projects(
        &self,
        first: &str,
        second: &str,
        keep: Option<&str>,
        confirmed: bool,
        session_id: Option<&str>,
    ) -> Result<ProjectRecord> {
        let first = normalize_project_name(first);
        let second = normalize_project_name(second);
        let keep = keep.map(normalize_project_name).unwrap_or_else(|| first.clone());

        if keep != first && keep != second {
            return Err(SitewiseError::InvalidParameters(vec![format!(
                "keep name '{}' must be either '{}' or '{}'",
                keep, first, second
            )]));
        }
        if first == second {
            return Err(SitewiseError::InvalidParameters(vec![
                "cannot merge a project with itself".to_string(),
            ]));
        }

        let first_record = self.require(&first).await?;
        let second_record = self.require(&second).await?;

        let (mut survivor, absorbed) = if keep == first {
            (first_record, second_record)
        } else {
            (second_record, first_record)
        };

        if !confirmed {
            return Err(confirmation_required(
                format!("merge '{}' into '{}'", absorbed.project_name, survivor.project_name),
                format!(
                    "Merge '{}' into '{}'? '{}' will be deleted.",
                    absorbed.project_name, survivor.project_name, absorbed.project_name
                ),
            ));
        }

        survivor.fill_gaps_from(&absorbed);
        self.store.put_record(&survivor).await?;
        self.store.delete(&absorbed.project_name).await?;

        if let Some(session_id) = session_id {
            self.sessions
                .rename_project(session_id, &absorbed.project_name, &survivor.project_name)
                .await?;
        }

        tracing::info!(survivor = %survivor.project_name, absorbed = %absorbed.project_name, "Projects merged");
        Ok(survivor)
    }

    pub async fn archive_project(&self, name: &str, session_id: Option<&str>) -> Result<ProjectRecord> {
        let name = normalize_project_name(name);
        self.require(&name).await?;

        let record = self.store.save(&name, ProjectUpdate::new().archived(true)).await?;
        if let Some(session_id) = session_id {
            self.sessions.clear_active_if(session_id, &name).await?;
        }
        Ok(record)
    }

    pub async fn unarchive_project(&self, name: &str) -> Result<ProjectRecord> {
        let name = normalize_project_name(name);
        self.require(&name).await?;
        self.store.save(&name, ProjectUpdate::new().archived(false)).await
    }

    /// Project summaries by name; archived projects only when requested
    pub async fn list_projects(&self, include_archived: bool) -> Result<Vec<ProjectSummary>> {
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .filter(|r| include_archived || !r.is_archived())
            .map(ProjectRecord::summary)
            .collect())
    }

    /// Apply `filters` one after another over the full project list
    pub async fn search_projects(&self, filters: &SearchFilters) -> Result<Vec<ProjectSummary>> {
        if let Some((center, radius_km)) = &filters.near {
            center.validate()?;
            validate_search_radius(*radius_km)?;
        }

        let mut records = self.store.list().await?;

        if let Some(fragment) = &filters.name_contains {
            let fragment = normalize_project_name(fragment);
            records.retain(|r| r.project_name.contains(&fragment));
        }
        if let Some(after) = filters.created_after {
            records.retain(|r| r.created_at >= after);
        }
        if let Some(before) = filters.created_before {
            records.retain(|r| r.created_at <= before);
        }
        if filters.incomplete_only {
            records.retain(|r| !r.has_stage(Stage::Report));
        }
        if let Some(archived) = filters.archived {
            records.retain(|r| r.is_archived() == archived);
        }
        if let Some((center, radius_km)) = &filters.near {
            records.retain(|r| r.coordinates.is_some_and(|c| within_radius(center, &c, *radius_km)));
        }

        Ok(records.iter().map(ProjectRecord::summary).collect())
    }

    pub async fn export_project(&self, name: &str) -> Result<ProjectExport> {
        let record = self.require(&normalize_project_name(name)).await?;
        Ok(ProjectExport {
            version: EXPORT_FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            artifact_references: artifact_references(&record),
            project: record,
        })
    }

    /// Store an exported project, renaming it `<name>-imported` on collision
    pub async fn import_project(&self, export: ProjectExport) -> Result<ProjectRecord> {
        if export.version != EXPORT_FORMAT_VERSION {
            return Err(SitewiseError::UnsupportedExportVersion {
                version: export.version,
                supported: EXPORT_FORMAT_VERSION.to_string(),
            });
        }

        let mut record = export.project;
        let name = validate_project_name(&record.project_name)?;
        let taken: HashSet<String> = self.store.list_names().await?.into_iter().collect();

        record.project_name = if taken.contains(&name) {
            unique_name(&format!("{}-imported", name), |c| taken.contains(c))
        } else {
            name
        };
        record.metadata.imported_at = Some(Utc::now());
        record.metadata.active_operation = None;

        self.store.put_record(&record).await?;
        tracing::info!(project = %record.project_name, "Project imported");
        Ok(record)
    }

    /// Act on a numbered reply to a duplicate prompt; `None` when nothing is pending
    pub async fn handle_duplicate_choice(
        &self,
        session_id: &str,
        choice: u8,
    ) -> Result<Option<DuplicateChoiceOutcome>> {
        let Some(pending) = self.sessions.take_pending_duplicate(session_id).await? else {
            return Ok(None);
        };

        let outcome = match choice {
            1 => {
                let Some(nearest) = pending.candidates.first() else {
                    return Ok(Some(DuplicateChoiceOutcome::CreateNew { query: pending.query }));
                };
                self.sessions.set_active_project(session_id, &nearest.project_name).await?;
                DuplicateChoiceOutcome::ContinueExisting {
                    project: nearest.project_name.clone(),
                    query: pending.query,
                }
            }
            2 => DuplicateChoiceOutcome::CreateNew { query: pending.query },
            3 => {
                let mut candidates = Vec::with_capacity(pending.candidates.len());
                for candidate in &pending.candidates {
                    if let Some(record) = self.store.load(&candidate.project_name).await? {
                        candidates.push(record.summary());
                    }
                }
                let prompt = duplicate_prompt(&pending.candidates);
                self.sessions.set_pending_duplicate(session_id, pending).await?;
                DuplicateChoiceOutcome::ShowDetails { candidates, prompt }
            }
            other => {
                self.sessions.set_pending_duplicate(session_id, pending).await?;
                return Err(SitewiseError::InvalidParameters(vec![format!(
                    "choice must be 1, 2 or 3 (got {})",
                    other
                )]));
            }
        };
        Ok(Some(outcome))
    }

    /// Suspend `query` until the user picks one of `candidates`
    pub async fn suspend_for_duplicates(
        &self,
        session_id: &str,
        query: &str,
        coordinates: Coordinates,
        candidates: Vec<DuplicateMatch>,
    ) -> Result<String> {
        let prompt = duplicate_prompt(&candidates);
        self.sessions
            .set_pending_duplicate(
                session_id,
                PendingDuplicateCheck {
                    query: query.to_string(),
                    coordinates,
                    candidates,
                    created_at: Utc::now(),
                },
            )
            .await?;
        Ok(prompt)
    }

    pub async fn dashboard(&self, session_id: Option<&str>) -> Result<Dashboard> {
        let active_project = match session_id {
            Some(id) => self.sessions.get(id).await?.active_project,
            None => None,
        };

        let records = self.store.list().await?;
        let groups = self.duplicate_groups(None).await?;
        let duplicates: HashSet<&str> = groups
            .iter()
            .flat_map(|g| g.projects.iter().map(|p| p.project_name.as_str()))
            .collect();

        let mut totals = DashboardTotals { duplicate_groups: groups.len(), ..Default::default() };
        let mut projects = Vec::new();

        for record in &records {
            if record.is_archived() {
                totals.archived += 1;
                continue;
            }
            totals.projects += 1;
            match record.status {
                ProjectStatus::Completed => totals.completed += 1,
                ProjectStatus::InProgress => totals.in_progress += 1,
                ProjectStatus::NotStarted | ProjectStatus::Failed => {}
            }
            projects.push(DashboardEntry {
                project_name: record.project_name.clone(),
                status: record.status,
                completion_percentage: record.completion_percentage(),
                location: record.coordinates,
                completed_stages: record.completed_stages(),
                is_active: active_project.as_deref() == Some(record.project_name.as_str()),
                is_duplicate: duplicates.contains(record.project_name.as_str()),
                updated_at: record.updated_at,
            });
        }

        Ok(Dashboard { projects, totals, active_project })
    }
}
