use serde::Serialize;
use sitewise_core::models::{Coordinates, DuplicateGroup, ProjectSummary};
use sitewise_orchestrator::DashboardEntry;
use tabled::Tabled;

fn location(coordinates: Option<Coordinates>) -> String {
    coordinates.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Row of `projects list` and `projects search`
#[derive(Debug, Serialize, Tabled)]
pub struct ProjectRow {
    #[tabled(rename = "Project")]
    pub name: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Complete")]
    pub completion: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Archived")]
    pub archived: bool,
    #[tabled(rename = "Updated")]
    pub updated: String,
}

impl From<&ProjectSummary> for ProjectRow {
    fn from(summary: &ProjectSummary) -> Self {
        Self {
            name: summary.project_name.clone(),
            status: summary.status.to_string(),
            completion: format!("{}%", summary.completion_percentage),
            location: location(summary.coordinates),
            archived: summary.archived,
            updated: summary.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct DashboardRow {
    #[tabled(rename = "")]
    pub marker: &'static str,
    #[tabled(rename = "Project")]
    pub name: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Complete")]
    pub completion: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Duplicate")]
    pub duplicate: bool,
}

impl From<&DashboardEntry> for DashboardRow {
    fn from(entry: &DashboardEntry) -> Self {
        Self {
            marker: if entry.is_active { "▶" } else { "" },
            name: entry.project_name.clone(),
            status: entry.status.to_string(),
            completion: format!("{}%", entry.completion_percentage),
            location: location(entry.location),
            duplicate: entry.is_duplicate,
        }
    }
}

/// One project inside a proximity group
#[derive(Debug, Serialize, Tabled)]
pub struct DuplicateRow {
    #[tabled(rename = "Group")]
    pub group: usize,
    #[tabled(rename = "Project")]
    pub name: String,
    #[tabled(rename = "Distance (km)")]
    pub distance_km: String,
    #[tabled(rename = "Location")]
    pub location: String,
}

pub fn duplicate_rows(groups: &[DuplicateGroup]) -> Vec<DuplicateRow> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(index, group)| {
            group.projects.iter().map(move |m| DuplicateRow {
                group: index + 1,
                name: m.project_name.clone(),
                distance_km: format!("{:.2}", m.distance_km),
                location: m.coordinates.to_string(),
            })
        })
        .collect()
}

/// Effective configuration value and the layer it came from
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core::models::{ProjectRecord, ProjectUpdate, Stage};

    #[test]
    fn test_project_row_formats_summary() {
        let mut record = ProjectRecord::new("abilene-wind-farm");
        record.apply(
            ProjectUpdate::new()
                .coordinates(Coordinates::new(32.4487, -99.7331))
                .stage_result(Stage::Terrain, serde_json::json!({})),
        );

        let row = ProjectRow::from(&record.summary());
        assert_eq!(row.name, "abilene-wind-farm");
        assert_eq!(row.status, "in_progress");
        assert_eq!(row.completion, "25%");
        assert_ne!(row.location, "-");
    }

    #[test]
    fn test_duplicate_rows_number_groups_from_one() {
        let group = DuplicateGroup {
            center_coordinates: Coordinates::new(32.45, -99.73),
            projects: vec![
                sitewise_core::models::DuplicateMatch {
                    project_name: "a".into(),
                    coordinates: Coordinates::new(32.45, -99.73),
                    distance_km: 0.0,
                },
                sitewise_core::models::DuplicateMatch {
                    project_name: "b".into(),
                    coordinates: Coordinates::new(32.452, -99.73),
                    distance_km: 0.222,
                },
            ],
            average_distance_km: 0.111,
        };

        let rows = duplicate_rows(&[group]);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.group == 1));
        assert_eq!(rows[1].distance_km, "0.22");
    }
}
