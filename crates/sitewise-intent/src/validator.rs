//! Parameter validation with project-context back-fill.

use serde_json::{Map, Value};
use sitewise_core::error::SitewiseError;
use sitewise_core::models::{Intent, IntentType, InvalidValue, ProjectRecord, Stage, ValidationResult};

/// Project field that can stand in for a missing parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextField {
    Coordinates,
    Stage(Stage),
}

#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Number(f64),
    Text(&'static str),
    /// ceil(capacity_mw / 2.5), kept within the turbine count bounds
    TurbinesFromCapacity,
}

struct Rules {
    required: &'static [&'static str],
    context: &'static [(&'static str, ContextField)],
    defaults: &'static [(&'static str, DefaultValue)],
}

const MAX_TURBINES: u64 = 1000;

const COORDINATE_CONTEXT: &[(&str, ContextField)] =
    &[("latitude", ContextField::Coordinates), ("longitude", ContextField::Coordinates)];

const NO_RULES: Rules = Rules { required: &[], context: &[], defaults: &[] };

fn rules_for(kind: IntentType) -> Rules {
    match kind {
        IntentType::TerrainAnalysis => Rules {
            required: &["latitude", "longitude"],
            context: COORDINATE_CONTEXT,
            defaults: &[("radius_km", DefaultValue::Number(5.0))],
        },
        IntentType::LayoutOptimization => Rules {
            required: &["latitude", "longitude"],
            context: COORDINATE_CONTEXT,
            defaults: &[
                ("capacity_mw", DefaultValue::Number(30.0)),
                ("num_turbines", DefaultValue::TurbinesFromCapacity),
                ("layout_type", DefaultValue::Text("grid")),
            ],
        },
        IntentType::WakeSimulation => Rules {
            required: &["latitude", "longitude", "layout"],
            context: &[
                ("latitude", ContextField::Coordinates),
                ("longitude", ContextField::Coordinates),
                ("layout", ContextField::Stage(Stage::Layout)),
            ],
            defaults: &[
                ("wind_speed", DefaultValue::Number(8.5)),
                ("wake_model", DefaultValue::Text("jensen")),
            ],
        },
        IntentType::WindRose => Rules {
            required: &["latitude", "longitude"],
            context: COORDINATE_CONTEXT,
            defaults: &[],
        },
        IntentType::ReportGeneration => Rules {
            required: &["simulation"],
            context: &[("simulation", ContextField::Stage(Stage::Simulation))],
            defaults: &[("format", DefaultValue::Text("pdf"))],
        },
        IntentType::FinancialAnalysis => Rules {
            required: &["simulation"],
            context: &[("simulation", ContextField::Stage(Stage::Simulation))],
            defaults: &[("analysis_type", DefaultValue::Text("financial"))],
        },
        IntentType::DeleteProject
        | IntentType::RenameProject
        | IntentType::MergeProjects
        | IntentType::ArchiveProject
        | IntentType::UnarchiveProject
        | IntentType::ExportProject
        | IntentType::SearchProjects
        | IntentType::ProjectDashboard => NO_RULES,
    }
}

fn context_available(field: ContextField, project: &ProjectRecord) -> bool {
    match field {
        ContextField::Coordinates => project.coordinates.is_some(),
        ContextField::Stage(stage) => project.has_stage(stage),
    }
}

fn is_present(params: &Map<String, Value>, key: &str) -> bool {
    params.get(key).is_some_and(|v| !v.is_null())
}

fn number_in(value: &Value, min: f64, max: f64, min_inclusive: bool) -> Option<String> {
    let Some(n) = value.as_f64() else {
        return Some("must be a number".to_string());
    };
    let above_min = if min_inclusive { n >= min } else { n > min };
    if !n.is_finite() || !above_min || n > max {
        let open = if min_inclusive { '[' } else { '(' };
        return Some(format!("must be in {}{}, {}]", open, min, max));
    }
    None
}

fn one_of(value: &Value, allowed: &[&str]) -> Option<String> {
    match value.as_str() {
        Some(s) if allowed.contains(&s) => None,
        _ => Some(format!("must be one of {}", allowed.join(", "))),
    }
}

/// Constraint violation for a known parameter, if any
fn check_constraint(key: &str, value: &Value) -> Option<String> {
    match key {
        "latitude" => number_in(value, -90.0, 90.0, true),
        "longitude" => number_in(value, -180.0, 180.0, true),
        "radius_km" => number_in(value, 0.0, 50.0, false),
        "capacity_mw" => number_in(value, 0.0, 2000.0, false),
        "num_turbines" => match value.as_u64() {
            Some(n) if (1..=MAX_TURBINES).contains(&n) => None,
            _ => Some(format!("must be an integer in [1, {}]", MAX_TURBINES)),
        },
        "wind_speed" => number_in(value, 0.0, 40.0, true),
        "wake_model" => one_of(value, &["jensen", "larsen", "bastankhah"]),
        "layout_type" => one_of(value, &["grid", "offset", "greedy"]),
        "format" => one_of(value, &["pdf", "html", "json"]),
        _ => None,
    }
}

/// Query that produces the project data a missing parameter stands for
fn prerequisite(parameter: &str, project: &str) -> Option<(&'static str, String)> {
    match parameter {
        "layout" => Some(("layout results", format!("optimize layout for {}", project))),
        "simulation" => Some(("simulation results", format!("run wake simulation for {}", project))),
        "latitude" | "longitude" => {
            Some(("coordinates", "analyze terrain at <latitude>, <longitude>".to_string()))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterValidator;

impl ParameterValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check required parameters (back-filling from `project`) and the
    /// constraints of every explicit or defaulted value.
    pub fn validate(&self, intent: &Intent, project: Option<&ProjectRecord>) -> ValidationResult {
        let rules = rules_for(intent.kind);
        let mut result = ValidationResult::default();

        for &parameter in rules.required {
            if is_present(&intent.params, parameter) {
                continue;
            }

            let field = rules.context.iter().find(|(p, _)| *p == parameter).map(|(_, f)| *f);
            match (field, project) {
                (Some(field), Some(project)) if context_available(field, project) => {
                    tracing::warn!(
                        parameter,
                        project = %project.project_name,
                        intent = %intent.kind,
                        "Parameter satisfied from project context"
                    );
                    result.warnings.push(format!(
                        "Using {} from project '{}'",
                        parameter, project.project_name
                    ));
                    result.satisfied_by_context.push(parameter.to_string());
                }
                _ => result.missing_required.push(parameter.to_string()),
            }
        }

        let effective = self.apply_defaults(intent, project);
        for (key, value) in &effective.params {
            if let Some(reason) = check_constraint(key, value) {
                result.invalid_values.push(InvalidValue {
                    parameter: key.clone(),
                    value: value.clone(),
                    reason,
                });
            }
        }

        result.finalize()
    }

    /// Fill coordinates from the project and optional parameters from defaults
    pub fn apply_defaults(&self, intent: &Intent, project: Option<&ProjectRecord>) -> Intent {
        let rules = rules_for(intent.kind);
        let mut intent = intent.clone();

        if let Some(coordinates) = project.and_then(|p| p.coordinates) {
            let wants_coordinates = rules.required.contains(&"latitude");
            let has_any = is_present(&intent.params, "latitude") || is_present(&intent.params, "longitude");
            if wants_coordinates && !has_any {
                intent.params.insert("latitude".to_string(), coordinates.latitude.into());
                intent.params.insert("longitude".to_string(), coordinates.longitude.into());
            }
        }

        for (key, default) in rules.defaults {
            if is_present(&intent.params, key) {
                continue;
            }
            let value = match default {
                DefaultValue::Number(n) => Value::from(*n),
                DefaultValue::Text(s) => Value::from(*s),
                DefaultValue::TurbinesFromCapacity => {
                    let capacity = intent.param_f64("capacity_mw").unwrap_or(30.0);
                    Value::from((capacity / 2.5).ceil().clamp(1.0, MAX_TURBINES as f64) as u64)
                }
            };
            intent.params.insert(key.to_string(), value);
        }

        intent
    }

    /// Error for an invalid result: missing project data when a prerequisite
    /// stage is absent, otherwise the collected parameter problems.
    pub fn to_error(&self, result: &ValidationResult, project_name: Option<&str>) -> SitewiseError {
        if let Some(project) = project_name {
            for parameter in &result.missing_required {
                if let Some((missing, next_query)) = prerequisite(parameter, project) {
                    return SitewiseError::MissingProjectData {
                        project: project.to_string(),
                        missing: missing.to_string(),
                        next_query,
                    };
                }
            }
        }
        SitewiseError::InvalidParameters(result.error_lines())
    }
}

impl Default for ParameterValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitewise_core::models::{Coordinates, ProjectUpdate};

    fn project_with(update: ProjectUpdate) -> ProjectRecord {
        let mut record = ProjectRecord::new("abilene-wind-farm");
        record.apply(update);
        record
    }

    #[test]
    fn test_context_backfill_of_coordinates() {
        let intent = Intent::new(IntentType::LayoutOptimization, 90);
        let project = project_with(ProjectUpdate::new().coordinates(Coordinates::new(32.45, -99.73)));

        let result = ParameterValidator::new().validate(&intent, Some(&project));

        assert!(result.is_valid);
        assert!(result.context_used);
        assert_eq!(result.satisfied_by_context, vec!["latitude", "longitude"]);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_missing_without_context_is_hard_error() {
        let intent = Intent::new(IntentType::TerrainAnalysis, 90);
        let result = ParameterValidator::new().validate(&intent, None);

        assert!(!result.is_valid);
        assert_eq!(result.missing_required, vec!["latitude", "longitude"]);
    }

    #[test]
    fn test_missing_layout_maps_to_missing_project_data() {
        let validator = ParameterValidator::new();
        let intent = Intent::new(IntentType::WakeSimulation, 90);
        let project = project_with(ProjectUpdate::new().coordinates(Coordinates::new(32.45, -99.73)));

        let result = validator.validate(&intent, Some(&project));
        assert_eq!(result.missing_required, vec!["layout"]);

        match validator.to_error(&result, Some("abilene-wind-farm")) {
            SitewiseError::MissingProjectData { next_query, .. } => {
                assert_eq!(next_query, "optimize layout for abilene-wind-farm")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_layout_satisfied_by_stage_result() {
        let intent = Intent::new(IntentType::WakeSimulation, 90);
        let project = project_with(
            ProjectUpdate::new()
                .coordinates(Coordinates::new(32.45, -99.73))
                .stage_result(Stage::Layout, json!({"turbines": []})),
        );

        let result = ParameterValidator::new().validate(&intent, Some(&project));
        assert!(result.is_valid);
        assert!(result.satisfied_by_context.contains(&"layout".to_string()));
    }

    #[test]
    fn test_defaults_and_derived_turbine_count() {
        let intent = Intent::new(IntentType::LayoutOptimization, 90)
            .with_param("latitude", 32.45)
            .with_param("longitude", -99.73)
            .with_param("capacity_mw", 31.0);

        let filled = ParameterValidator::new().apply_defaults(&intent, None);
        assert_eq!(filled.params["num_turbines"], 13);
        assert_eq!(filled.params["layout_type"], "grid");
        assert_eq!(filled.params["capacity_mw"], 31.0);

        let defaulted = ParameterValidator::new()
            .apply_defaults(&Intent::new(IntentType::LayoutOptimization, 90), None);
        assert_eq!(defaulted.params["capacity_mw"], 30.0);
        assert_eq!(defaulted.params["num_turbines"], 12);
    }

    #[test]
    fn test_oversized_capacity_reports_only_the_supplied_value() {
        let intent = Intent::new(IntentType::LayoutOptimization, 90)
            .with_param("latitude", 32.45)
            .with_param("longitude", -99.73)
            .with_param("capacity_mw", 3000.0);

        let result = ParameterValidator::new().validate(&intent, None);
        assert!(!result.is_valid);
        let invalid: Vec<&str> = result.invalid_values.iter().map(|v| v.parameter.as_str()).collect();
        assert_eq!(invalid, vec!["capacity_mw"]);

        let filled = ParameterValidator::new().apply_defaults(&intent, None);
        assert_eq!(filled.params["num_turbines"], 1000);
    }

    #[test]
    fn test_constraints_apply_to_explicit_values() {
        let intent = Intent::new(IntentType::TerrainAnalysis, 90)
            .with_param("latitude", 95.0)
            .with_param("longitude", -99.73)
            .with_param("radius_km", 80.0);

        let result = ParameterValidator::new().validate(&intent, None);
        assert!(!result.is_valid);

        let invalid: Vec<&str> = result.invalid_values.iter().map(|v| v.parameter.as_str()).collect();
        assert!(invalid.contains(&"latitude"));
        assert!(invalid.contains(&"radius_km"));
        assert!(matches!(
            ParameterValidator::new().to_error(&result, None),
            SitewiseError::InvalidParameters(_)
        ));
    }

    #[test]
    fn test_enumerated_values() {
        let intent = Intent::new(IntentType::WakeSimulation, 90)
            .with_param("latitude", 32.0)
            .with_param("longitude", -99.0)
            .with_param("layout", json!({}))
            .with_param("wake_model", "park");

        let result = ParameterValidator::new().validate(&intent, None);
        assert_eq!(result.invalid_values.len(), 1);
        assert_eq!(result.invalid_values[0].parameter, "wake_model");
    }

    #[test]
    fn test_lifecycle_intents_have_no_rules() {
        let result = ParameterValidator::new().validate(&Intent::new(IntentType::DeleteProject, 90), None);
        assert!(result.is_valid);
    }
}
