use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `?confirm=true&session_id=...` on destructive endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_archived: bool,
}

/// Project search query string
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub incomplete: bool,
    pub archived: Option<bool>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DuplicatesParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub new_name: String,
    #[serde(default)]
    pub confirm: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub first: String,
    pub second: String,
    /// Name that survives; defaults to `first`
    pub keep: Option<String>,
    #[serde(default)]
    pub confirm: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub pattern: String,
    #[serde(default)]
    pub confirm: bool,
    pub session_id: Option<String>,
}
