use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::{Coordinates, Stage};
use crate::error::SitewiseError;

/// Operation a query maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    TerrainAnalysis,
    LayoutOptimization,
    WakeSimulation,
    WindRose,
    ReportGeneration,
    FinancialAnalysis,
    DeleteProject,
    RenameProject,
    MergeProjects,
    ArchiveProject,
    UnarchiveProject,
    ExportProject,
    SearchProjects,
    ProjectDashboard,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TerrainAnalysis => "terrain_analysis",
            Self::LayoutOptimization => "layout_optimization",
            Self::WakeSimulation => "wake_simulation",
            Self::WindRose => "wind_rose",
            Self::ReportGeneration => "report_generation",
            Self::FinancialAnalysis => "financial_analysis",
            Self::DeleteProject => "delete_project",
            Self::RenameProject => "rename_project",
            Self::MergeProjects => "merge_projects",
            Self::ArchiveProject => "archive_project",
            Self::UnarchiveProject => "unarchive_project",
            Self::ExportProject => "export_project",
            Self::SearchProjects => "search_projects",
            Self::ProjectDashboard => "project_dashboard",
        }
    }

    /// Phrase used in confirmation questions
    pub fn label(&self) -> &'static str {
        match self {
            Self::TerrainAnalysis => "terrain analysis",
            Self::LayoutOptimization => "layout optimization",
            Self::WakeSimulation => "wake simulation",
            Self::WindRose => "wind rose analysis",
            Self::ReportGeneration => "report generation",
            Self::FinancialAnalysis => "financial analysis",
            Self::DeleteProject => "deleting a project",
            Self::RenameProject => "renaming a project",
            Self::MergeProjects => "merging projects",
            Self::ArchiveProject => "archiving a project",
            Self::UnarchiveProject => "unarchiving a project",
            Self::ExportProject => "exporting a project",
            Self::SearchProjects => "searching projects",
            Self::ProjectDashboard => "the project dashboard",
        }
    }

    /// Downstream capability serving this intent; `None` for lifecycle intents
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Self::TerrainAnalysis => Some(Capability::Terrain),
            Self::LayoutOptimization => Some(Capability::Layout),
            Self::WakeSimulation | Self::WindRose => Some(Capability::Simulation),
            Self::ReportGeneration | Self::FinancialAnalysis => Some(Capability::Report),
            Self::DeleteProject
            | Self::RenameProject
            | Self::MergeProjects
            | Self::ArchiveProject
            | Self::UnarchiveProject
            | Self::ExportProject
            | Self::SearchProjects
            | Self::ProjectDashboard => None,
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        self.capability().is_none()
    }

    /// Project record field the capability result is persisted into
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::TerrainAnalysis => Some(Stage::Terrain),
            Self::LayoutOptimization => Some(Stage::Layout),
            Self::WakeSimulation => Some(Stage::Simulation),
            Self::ReportGeneration => Some(Stage::Report),
            _ => None,
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Downstream analysis capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Terrain,
    Layout,
    Simulation,
    Report,
}

impl Capability {
    pub const ALL: [Capability; 4] =
        [Capability::Terrain, Capability::Layout, Capability::Simulation, Capability::Report];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terrain => "terrain",
            Self::Layout => "layout",
            Self::Simulation => "simulation",
            Self::Report => "report",
        }
    }

    /// Environment variable configuring the function identifier
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Terrain => "SITEWISE_TERRAIN_FUNCTION",
            Self::Layout => "SITEWISE_LAYOUT_FUNCTION",
            Self::Simulation => "SITEWISE_SIMULATION_FUNCTION",
            Self::Report => "SITEWISE_REPORT_FUNCTION",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = SitewiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terrain" => Ok(Self::Terrain),
            "layout" => Ok(Self::Layout),
            "simulation" | "wake" => Ok(Self::Simulation),
            "report" => Ok(Self::Report),
            other => Err(SitewiseError::ConfigInvalid {
                key: "required_capabilities".to_string(),
                reason: format!(
                    "Unknown capability: {}. Use terrain, layout, simulation, or report",
                    other
                ),
            }),
        }
    }
}

/// Ranked runner-up intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentAlternative {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: u8,
}

/// Classified intent with extracted parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentType,

    #[serde(default)]
    pub params: Map<String, Value>,

    /// 0-100
    pub confidence: u8,

    #[serde(default)]
    pub alternatives: Vec<IntentAlternative>,
}

impl Intent {
    pub fn new(kind: IntentType, confidence: u8) -> Self {
        Self { kind, params: Map::new(), confidence, alternatives: Vec::new() }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.param_f64("latitude")?, self.param_f64("longitude")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_mapping_is_exhaustive_for_analysis_intents() {
        assert_eq!(IntentType::WindRose.capability(), Some(Capability::Simulation));
        assert_eq!(IntentType::FinancialAnalysis.capability(), Some(Capability::Report));
        assert!(IntentType::MergeProjects.is_lifecycle());
        assert!(!IntentType::TerrainAnalysis.is_lifecycle());
    }

    #[test]
    fn test_intent_serializes_type_field() {
        let intent = Intent::new(IntentType::TerrainAnalysis, 90)
            .with_param("latitude", 35.0)
            .with_param("longitude", -101.0);
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "terrain_analysis");
        assert_eq!(intent.coordinates(), Some(Coordinates::new(35.0, -101.0)));
    }

    #[test]
    fn test_parse_capability() {
        assert_eq!("Layout".parse::<Capability>().unwrap(), Capability::Layout);
        assert!("turbines".parse::<Capability>().is_err());
    }
}
