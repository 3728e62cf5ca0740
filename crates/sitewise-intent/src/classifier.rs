//! Intent classification over an immutable pattern registry.
//!
//! Each [`IntentDefinition`] scores a lowercased query: when at least one
//! pattern matches the base score is `0.6 + 0.1 * matches`, scaled by the
//! definition weight. Every matching exclusion subtracts 0.4; every keyword
//! adds 0.2 on a whole-word match or 0.15 on a loose substring match. Scores
//! are clamped to `[0, 1]` and ranked with a stable sort, so ties keep
//! registration order.

use regex::Regex;
use serde_json::Map;
use sitewise_core::models::{Intent, IntentAlternative, IntentType};

const PATTERN_BASE: f64 = 0.6;
const PATTERN_BONUS: f64 = 0.1;
const EXCLUSION_PENALTY: f64 = 0.4;
const KEYWORD_EXACT: f64 = 0.2;
const KEYWORD_LOOSE: f64 = 0.15;

const CONFIRMATION_CONFIDENCE: u8 = 70;
const CONFIRMATION_GAP: u8 = 20;
const MAX_ALTERNATIVES: usize = 3;

/// Patterns, exclusions, keywords and weight for one intent
#[derive(Debug, Clone)]
pub struct IntentDefinition {
    pub kind: IntentType,
    pub patterns: Vec<Regex>,
    pub exclusions: Vec<Regex>,
    pub keywords: Vec<(String, Regex)>,
    pub weight: f64,
}

impl IntentDefinition {
    /// Build a definition from pattern sources; panics on an invalid regex
    pub fn new(kind: IntentType, weight: f64) -> Self {
        Self { kind, patterns: Vec::new(), exclusions: Vec::new(), keywords: Vec::new(), weight }
    }

    pub fn patterns(mut self, sources: &[&str]) -> Self {
        self.patterns.extend(sources.iter().map(|s| compile(s)));
        self
    }

    pub fn exclusions(mut self, sources: &[&str]) -> Self {
        self.exclusions.extend(sources.iter().map(|s| compile(s)));
        self
    }

    pub fn keywords(mut self, words: &[&str]) -> Self {
        self.keywords.extend(
            words
                .iter()
                .map(|w| (w.to_string(), compile(&format!(r"\b{}\b", regex::escape(w))))),
        );
        self
    }

    /// Score a lowercased query
    pub fn score(&self, query: &str) -> f64 {
        let matches = self.patterns.iter().filter(|p| p.is_match(query)).count();

        let mut score = if matches > 0 {
            (PATTERN_BASE + PATTERN_BONUS * matches as f64) * self.weight
        } else {
            0.0
        };

        let excluded = self.exclusions.iter().filter(|e| e.is_match(query)).count();
        score -= EXCLUSION_PENALTY * excluded as f64;

        for (word, exact) in &self.keywords {
            if exact.is_match(query) {
                score += KEYWORD_EXACT;
            } else if query.contains(word.as_str()) {
                score += KEYWORD_LOOSE;
            }
        }

        score.clamp(0.0, 1.0)
    }
}

fn compile(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|e| panic!("invalid intent pattern {:?}: {}", source, e))
}

/// Ranked classification of a query
#[derive(Debug, Clone)]
pub struct Classification {
    /// Top intent with up to three alternatives attached
    pub intent: Intent,
    /// Every definition with a non-zero score, best first
    pub ranked: Vec<(IntentType, f64)>,
    pub requires_confirmation: bool,
}

/// Immutable intent definition table, built once and shared by reference
#[derive(Debug, Clone)]
pub struct IntentRegistry {
    definitions: Vec<IntentDefinition>,
}

impl IntentRegistry {
    pub fn new(definitions: Vec<IntentDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[IntentDefinition] {
        &self.definitions
    }

    /// Wind farm analysis and project lifecycle intents.
    ///
    /// Financial and report definitions are registered first with higher
    /// weights so a financial query mentioning terrain never lands on
    /// terrain analysis.
    pub fn standard() -> Self {
        Self::new(vec![
            IntentDefinition::new(IntentType::FinancialAnalysis, 1.3)
                .patterns(&[
                    r"\b(financial|finance|economics?)\b",
                    r"\b(roi|return on investment|npv|irr|lcoe|payback)\b",
                    r"\b(revenue|costs?|profitab\w*|cash ?flow)\b",
                ])
                .keywords(&["financial", "roi", "revenue", "cost", "economic", "investment", "payback"]),
            IntentDefinition::new(IntentType::ReportGeneration, 1.2)
                .patterns(&[
                    r"\breports?\b",
                    r"\b(generate|create|produce|write)\b.*\b(report|summary|document)\b",
                    r"\bexecutive summary\b",
                ])
                .exclusions(&[r"\b(financial|roi|npv|irr|payback)\b"])
                .keywords(&["report", "summary", "document", "pdf"]),
            IntentDefinition::new(IntentType::WakeSimulation, 1.1)
                .patterns(&[
                    r"\bwake\b",
                    r"\bsimulat\w*",
                    r"\b(aep|annual energy production|energy yield|energy production)\b",
                ])
                .exclusions(&[r"\bwind ?rose\b", r"\breports?\b"])
                .keywords(&["wake", "simulation", "energy", "performance", "losses"]),
            IntentDefinition::new(IntentType::WindRose, 1.1)
                .patterns(&[r"\bwind ?rose\b", r"\bwind (direction|distribution)s?\b"])
                .keywords(&["wind rose", "direction", "frequency"]),
            IntentDefinition::new(IntentType::LayoutOptimization, 1.1)
                .patterns(&[
                    r"\blayouts?\b",
                    r"\b(place|position|arrange|optimi[sz]e)\w*\b.*\bturbines?\b",
                    r"\bturbine (placement|positions?|spacing)\b",
                ])
                .exclusions(&[r"\bwake\b", r"\bsimulat\w*", r"\breports?\b"])
                .keywords(&["layout", "turbine", "placement", "spacing", "optimize", "capacity"]),
            IntentDefinition::new(IntentType::TerrainAnalysis, 1.0)
                .patterns(&[
                    r"\bterrain\b",
                    r"\banaly[sz]\w*\b.*\b(site|terrain|land|area|location)\b",
                    r"\b(site|land) (analysis|assessment|suitability)\b",
                    r"\b(osm|openstreetmap)\b",
                    r"-?\d{1,3}\.\d+\s*°?\s*,\s*-?\d{1,3}\.\d+",
                ])
                .exclusions(&[r"\b(financial|roi|revenue|costs?|economic|payback|npv|irr)\b"])
                .keywords(&[
                    "terrain", "site", "topography", "elevation", "slope", "buildings", "roads",
                    "setback", "features", "suitability",
                ]),
            IntentDefinition::new(IntentType::DeleteProject, 1.2)
                .patterns(&[r"^\s*(delete|remove)\b", r"\b(delete|remove|erase)\b.*\bprojects?\b"])
                .keywords(&["delete", "remove"]),
            IntentDefinition::new(IntentType::RenameProject, 1.2)
                .patterns(&[r"\brename\b", r"\bchange (the )?name\b"])
                .keywords(&["rename"]),
            IntentDefinition::new(IntentType::MergeProjects, 1.2)
                .patterns(&[r"^\s*(merge|combine)\b", r"\b(merge|combine)\b.*\bprojects?\b"])
                .keywords(&["merge", "combine"]),
            IntentDefinition::new(IntentType::ArchiveProject, 1.2)
                .patterns(&[r"^\s*archive\b", r"\barchive\b.*\bprojects?\b"])
                .exclusions(&[r"\bunarchive\b"])
                .keywords(&["archive"]),
            IntentDefinition::new(IntentType::UnarchiveProject, 1.2)
                .patterns(&[r"\bunarchive\b", r"^\s*restore\b"])
                .keywords(&["unarchive", "restore"]),
            IntentDefinition::new(IntentType::ExportProject, 1.2)
                .patterns(&[r"^\s*export\b", r"\bexport\b.*\bprojects?\b"])
                .exclusions(&[r"\breports?\b"])
                .keywords(&["export"]),
            IntentDefinition::new(IntentType::SearchProjects, 1.2)
                .patterns(&[
                    r"\b(search|find)\b.*\bprojects?\b",
                    r"\bprojects?\b.*\b(near|within|named|matching|created (after|before))\b",
                    r"\b(incomplete|archived) projects?\b",
                ])
                .exclusions(&[r"\b(delete|remove|rename|merge|export)\b"])
                .keywords(&["search", "find", "near", "within"]),
            IntentDefinition::new(IntentType::ProjectDashboard, 1.2)
                .patterns(&[r"\bdashboard\b", r"\b(overview|status) of (all )?(my )?projects\b"])
                .keywords(&["dashboard", "overview"]),
        ])
    }

    /// Rank every definition against `query`
    pub fn classify(&self, query: &str) -> Classification {
        let lowered = query.to_lowercase();

        let mut ranked: Vec<(IntentType, f64)> = self
            .definitions
            .iter()
            .map(|d| (d.kind, d.score(&lowered)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable: equal scores keep registration order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let Some(&(top_kind, top_score)) = ranked.first() else {
            tracing::debug!(query, "No intent pattern matched, defaulting to terrain analysis");
            return Classification {
                intent: Intent::new(IntentType::TerrainAnalysis, 0),
                ranked,
                requires_confirmation: true,
            };
        };

        let alternatives: Vec<IntentAlternative> = ranked
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(|(kind, score)| IntentAlternative { kind: *kind, confidence: to_confidence(*score) })
            .collect();

        let confidence = to_confidence(top_score);
        let runner_up = alternatives.first().map_or(0, |a| a.confidence);
        let requires_confirmation =
            confidence < CONFIRMATION_CONFIDENCE || confidence.saturating_sub(runner_up) < CONFIRMATION_GAP;

        let intent = Intent { kind: top_kind, params: Map::new(), confidence, alternatives };
        tracing::debug!(intent = %intent.kind, confidence, requires_confirmation, "Classified query");

        Classification { intent, ranked, requires_confirmation }
    }
}

impl Default for IntentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn to_confidence(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(query: &str) -> Classification {
        IntentRegistry::standard().classify(query)
    }

    #[test]
    fn test_terrain_with_coordinates() {
        let result = classify("analyze terrain at 35.067482, -101.395466");
        assert_eq!(result.intent.kind, IntentType::TerrainAnalysis);
        assert_eq!(result.intent.confidence, 100);
        assert!(!result.requires_confirmation);
    }

    #[test]
    fn test_financial_query_mentioning_terrain_is_not_terrain() {
        let result = classify("what is the financial ROI given the terrain constraints");
        assert_eq!(result.intent.kind, IntentType::FinancialAnalysis);
        let terrain = result
            .ranked
            .iter()
            .find(|(kind, _)| *kind == IntentType::TerrainAnalysis)
            .map_or(0.0, |(_, score)| *score);
        assert!(terrain < 0.6, "terrain scored {}", terrain);
    }

    #[test]
    fn test_analysis_stages() {
        assert_eq!(
            classify("optimize the turbine layout for abilene-wind-farm").intent.kind,
            IntentType::LayoutOptimization
        );
        assert_eq!(classify("run wake simulation").intent.kind, IntentType::WakeSimulation);
        assert_eq!(classify("show me the wind rose").intent.kind, IntentType::WindRose);
        assert_eq!(classify("generate a report").intent.kind, IntentType::ReportGeneration);
        assert_eq!(
            classify("generate report for the simulation").intent.kind,
            IntentType::ReportGeneration
        );
    }

    #[test]
    fn test_lifecycle_intents() {
        assert_eq!(classify("delete project abilene-wind-farm").intent.kind, IntentType::DeleteProject);
        assert_eq!(
            classify("delete all projects matching texas").intent.kind,
            IntentType::DeleteProject
        );
        assert_eq!(classify("rename alpha to beta").intent.kind, IntentType::RenameProject);
        assert_eq!(classify("merge projects a and b").intent.kind, IntentType::MergeProjects);
        assert_eq!(classify("archive project alpha").intent.kind, IntentType::ArchiveProject);
        assert_eq!(classify("unarchive project alpha").intent.kind, IntentType::UnarchiveProject);
        assert_eq!(classify("export project alpha").intent.kind, IntentType::ExportProject);
        assert_eq!(classify("find projects near 35.0, -101.4").intent.kind, IntentType::SearchProjects);
        assert_eq!(classify("show my project dashboard").intent.kind, IntentType::ProjectDashboard);
    }

    #[test]
    fn test_unmatched_query_defaults_with_zero_confidence() {
        let result = classify("hello there");
        assert_eq!(result.intent.kind, IntentType::TerrainAnalysis);
        assert_eq!(result.intent.confidence, 0);
        assert!(result.requires_confirmation);
        assert!(result.ranked.is_empty());
    }

    #[test]
    fn test_close_scores_require_confirmation() {
        // Layout and terrain both fire, but layout's exclusion does not
        let result = classify("site layout");
        assert!(result.intent.alternatives.len() <= MAX_ALTERNATIVES);
        if let Some(alt) = result.intent.alternatives.first() {
            let gap = result.intent.confidence.saturating_sub(alt.confidence);
            assert_eq!(result.requires_confirmation, result.intent.confidence < 70 || gap < 20);
        }
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let registry = IntentRegistry::new(vec![
            IntentDefinition::new(IntentType::WindRose, 1.0).patterns(&[r"\bwind\b"]),
            IntentDefinition::new(IntentType::WakeSimulation, 1.0).patterns(&[r"\bwind\b"]),
        ]);

        let result = registry.classify("wind");
        assert_eq!(result.intent.kind, IntentType::WindRose);
        assert_eq!(result.intent.alternatives[0].kind, IntentType::WakeSimulation);
        assert!(result.requires_confirmation);
    }

    proptest! {
        #[test]
        fn prop_coordinates_keep_terrain_candidate(
            lat in -89.0f64..89.0,
            lon in -179.0f64..179.0,
            filler in "(please|now|quickly|for me|the site|layout|turbines)",
        ) {
            let query = format!("{} {:.4}, {:.4}", filler, lat, lon);
            let result = classify(&query);
            prop_assert!(result.ranked.iter().any(|(kind, _)| *kind == IntentType::TerrainAnalysis));
        }
    }
}
