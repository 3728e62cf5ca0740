//! GeoJSON rendering of project locations

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use sitewise_core::models::ProjectSummary;

/// Point feature for a project, `None` when it has no coordinates yet
pub fn project_feature(summary: &ProjectSummary) -> Option<Feature> {
    let coordinates = summary.coordinates?;

    let mut properties = JsonObject::new();
    properties.insert("project_name".to_string(), json!(summary.project_name));
    properties.insert("status".to_string(), json!(summary.status));
    properties.insert("completion_percentage".to_string(), json!(summary.completion_percentage));
    properties.insert("archived".to_string(), json!(summary.archived));

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            coordinates.longitude,
            coordinates.latitude,
        ]))),
        id: Some(geojson::feature::Id::String(summary.project_name.clone())),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// One point feature per located project
pub fn projects_feature_collection(summaries: &[ProjectSummary]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: summaries.iter().filter_map(project_feature).collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core::models::{Coordinates, ProjectRecord, ProjectUpdate};

    #[test]
    fn test_feature_collection_skips_unlocated_projects() {
        let mut located = ProjectRecord::new("abilene-wind-farm");
        located.apply(ProjectUpdate::new().coordinates(Coordinates::new(32.4487, -99.7331)));
        let unlocated = ProjectRecord::new("draft-site");

        let collection = projects_feature_collection(&[located.summary(), unlocated.summary()]);
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        let properties = feature.properties.as_ref().unwrap();
        assert_eq!(properties["project_name"], "abilene-wind-farm");
        assert_eq!(properties["status"], "not_started");

        match &feature.geometry.as_ref().unwrap().value {
            Value::Point(position) => assert_eq!(position, &vec![-99.7331, 32.4487]),
            other => panic!("expected point, got {:?}", other),
        }
    }
}
