use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SitewiseError};

/// WGS 84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check latitude/longitude ranges
    pub fn validate(&self) -> Result<()> {
        let reason = if !self.latitude.is_finite() || !self.longitude.is_finite() {
            Some("coordinates must be finite numbers")
        } else if !(-90.0..=90.0).contains(&self.latitude) {
            Some("latitude must be between -90 and 90")
        } else if !(-180.0..=180.0).contains(&self.longitude) {
            Some("longitude must be between -180 and 180")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SitewiseError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Workflow status of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Analysis stage whose result is persisted on the project record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Terrain,
    Layout,
    Simulation,
    Report,
}

impl Stage {
    /// Stages in workflow order
    pub const ALL: [Stage; 4] = [Stage::Terrain, Stage::Layout, Stage::Simulation, Stage::Report];

    /// Name of the record field holding this stage's result
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Terrain => "terrain_results",
            Self::Layout => "layout_results",
            Self::Simulation => "simulation_results",
            Self::Report => "report_results",
        }
    }

    /// Human-readable stage label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Terrain => "terrain analysis",
            Self::Layout => "layout optimization",
            Self::Simulation => "wake simulation",
            Self::Report => "report",
        }
    }
}

/// Project metadata (nested-merged on save)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub archived: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,

    /// Stage dispatched asynchronously and not yet persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Numeric metrics derived from stage results
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

/// Persisted unit of work-in-progress, keyed by `project_name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain_results: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_results: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_results: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_results: Option<Value>,

    #[serde(default)]
    pub metadata: ProjectMetadata,

    #[serde(default)]
    pub status: ProjectStatus,
}

impl ProjectRecord {
    /// Create an empty record for a (normalized) project name
    pub fn new(project_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id: format!("proj-{}", uuid::Uuid::new_v4()),
            project_name: project_name.into(),
            created_at: now,
            updated_at: now,
            coordinates: None,
            terrain_results: None,
            layout_results: None,
            simulation_results: None,
            report_results: None,
            metadata: ProjectMetadata::default(),
            status: ProjectStatus::NotStarted,
        }
    }

    pub fn stage_result(&self, stage: Stage) -> Option<&Value> {
        match stage {
            Stage::Terrain => self.terrain_results.as_ref(),
            Stage::Layout => self.layout_results.as_ref(),
            Stage::Simulation => self.simulation_results.as_ref(),
            Stage::Report => self.report_results.as_ref(),
        }
    }

    fn stage_slot(&mut self, stage: Stage) -> &mut Option<Value> {
        match stage {
            Stage::Terrain => &mut self.terrain_results,
            Stage::Layout => &mut self.layout_results,
            Stage::Simulation => &mut self.simulation_results,
            Stage::Report => &mut self.report_results,
        }
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stage_result(stage).is_some()
    }

    pub fn completed_stages(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|s| self.has_stage(*s)).collect()
    }

    /// 25% per completed stage
    pub fn completion_percentage(&self) -> u8 {
        (self.completed_stages().len() * 25) as u8
    }

    pub fn is_archived(&self) -> bool {
        self.metadata.archived
    }

    /// A stage has been dispatched and its result is not yet persisted
    pub fn is_processing(&self) -> bool {
        self.metadata.active_operation.is_some()
    }

    /// Status implied by the stage results present
    pub fn derive_status(&self) -> ProjectStatus {
        if self.report_results.is_some() {
            ProjectStatus::Completed
        } else if self.completed_stages().is_empty() {
            ProjectStatus::NotStarted
        } else {
            ProjectStatus::InProgress
        }
    }

    /// Merge-save: top-level fields present in the update replace the stored
    /// ones, `coordinates` and `metadata` are merged field by field.
    pub fn apply(&mut self, update: ProjectUpdate) {
        if let Some(coordinates) = update.coordinates {
            self.coordinates = Some(coordinates);
        }

        for (stage, value) in update.stages {
            *self.stage_slot(stage) = Some(value);
        }

        let metadata = &mut self.metadata;
        if let Some(archived) = update.archived {
            metadata.archived = archived;
            metadata.archived_at = if archived { Some(Utc::now()) } else { None };
        }
        if let Some(imported_at) = update.imported_at {
            metadata.imported_at = Some(imported_at);
        }
        if let Some(active_operation) = update.active_operation {
            metadata.active_operation = active_operation;
        }
        if let Some(last_error) = update.last_error {
            metadata.last_error = last_error;
        }
        metadata.metrics.extend(update.metrics);

        self.status = if self.metadata.last_error.is_some() {
            ProjectStatus::Failed
        } else {
            self.derive_status()
        };
        self.updated_at = Utc::now();
    }

    /// Union of non-null fields: `source` fills gaps this record lacks
    pub fn fill_gaps_from(&mut self, source: &ProjectRecord) {
        if self.coordinates.is_none() {
            self.coordinates = source.coordinates;
        }

        for stage in Stage::ALL {
            if !self.has_stage(stage) {
                if let Some(value) = source.stage_result(stage) {
                    *self.stage_slot(stage) = Some(value.clone());
                }
            }
        }

        for (key, value) in &source.metadata.metrics {
            self.metadata.metrics.entry(key.clone()).or_insert(*value);
        }
        if self.metadata.imported_at.is_none() {
            self.metadata.imported_at = source.metadata.imported_at;
        }
        if source.created_at < self.created_at {
            self.created_at = source.created_at;
        }

        self.status = self.derive_status();
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            project_name: self.project_name.clone(),
            status: self.status,
            coordinates: self.coordinates,
            completion_percentage: self.completion_percentage(),
            completed_stages: self.completed_stages(),
            archived: self.is_archived(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Partial record applied by merge-save
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    coordinates: Option<Coordinates>,
    stages: Vec<(Stage, Value)>,
    archived: Option<bool>,
    imported_at: Option<DateTime<Utc>>,
    active_operation: Option<Option<String>>,
    last_error: Option<Option<String>>,
    metrics: BTreeMap<String, f64>,
}

impl ProjectUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Store a stage result; numeric entries of its `metrics` object are
    /// copied into the metadata metrics.
    pub fn stage_result(mut self, stage: Stage, value: Value) -> Self {
        if let Some(metrics) = value.get("metrics").and_then(Value::as_object) {
            for (key, metric) in metrics {
                if let Some(number) = metric.as_f64() {
                    self.metrics.insert(key.clone(), number);
                }
            }
        }
        self.stages.push((stage, value));
        self.last_error = Some(None);
        self.active_operation = Some(None);
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn imported_at(mut self, at: DateTime<Utc>) -> Self {
        self.imported_at = Some(at);
        self
    }

    pub fn active_operation(mut self, operation: Option<String>) -> Self {
        self.active_operation = Some(operation);
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(Some(error.into()));
        self.active_operation = Some(None);
        self
    }

    pub fn metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_none()
            && self.stages.is_empty()
            && self.archived.is_none()
            && self.imported_at.is_none()
            && self.active_operation.is_none()
            && self.last_error.is_none()
            && self.metrics.is_empty()
    }
}

/// Listing view of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project_name: String,
    pub status: ProjectStatus,
    pub coordinates: Option<Coordinates>,
    pub completion_percentage: u8,
    pub completed_stages: Vec<Stage>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
