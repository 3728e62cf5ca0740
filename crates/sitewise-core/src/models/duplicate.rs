use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Existing project found near a requested site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub project_name: String,
    pub coordinates: Coordinates,
    pub distance_km: f64,
}

/// Cluster of projects whose coordinates fall within a radius of each other
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub center_coordinates: Coordinates,

    /// Ordered by distance from the center
    pub projects: Vec<DuplicateMatch>,

    pub average_distance_km: f64,
}
