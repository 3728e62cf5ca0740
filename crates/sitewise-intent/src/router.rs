//! Intent routing: classification plus capability availability.

use serde_json::Value;
use sitewise_core::config::CapabilityConfig;
use sitewise_core::models::{Intent, IntentAlternative, IntentType};
use std::sync::Arc;

use crate::classifier::IntentRegistry;
use crate::extract::extract_parameters;

const MIN_ALTERNATIVE_CONFIDENCE: u8 = 30;
const UNAVAILABLE_FALLBACK_CONFIDENCE: u8 = 50;

/// Routed intent ready for the orchestration engine
#[derive(Debug, Clone)]
pub struct RoutedIntent {
    pub intent: Intent,
    pub requires_confirmation: bool,
    /// Question or notice to show the user when confirmation is needed
    pub confirmation_message: Option<String>,
    /// Alternatives worth offering (confidence above 30)
    pub alternatives: Vec<IntentAlternative>,
    /// Classified intent replaced because its capability is unconfigured
    pub original_intent: Option<IntentType>,
}

pub struct IntentRouter {
    registry: Arc<IntentRegistry>,
    capabilities: CapabilityConfig,
}

impl IntentRouter {
    pub fn new(registry: Arc<IntentRegistry>, capabilities: CapabilityConfig) -> Self {
        Self { registry, capabilities }
    }

    fn is_available(&self, kind: IntentType) -> bool {
        kind.capability().map_or(true, |c| self.capabilities.is_available(c))
    }

    pub fn route(&self, query: &str) -> RoutedIntent {
        let classification = self.registry.classify(query);
        let mut intent = classification.intent;
        intent.params = extract_parameters(query);

        if !self.is_available(intent.kind) {
            let original = intent.kind;
            let fallback = classification
                .ranked
                .iter()
                .skip(1)
                .find(|(kind, _)| self.is_available(*kind))
                .map(|(kind, score)| (*kind, (score * 100.0).round() as u8));

            let (kind, confidence, message) = match fallback {
                Some((kind, confidence)) => (
                    kind,
                    confidence,
                    format!(
                        "{} isn't available in this deployment. I can run {} instead - would you like to proceed?",
                        capitalize(original.label()),
                        kind.label()
                    ),
                ),
                None => (
                    IntentType::TerrainAnalysis,
                    UNAVAILABLE_FALLBACK_CONFIDENCE,
                    format!(
                        "{} isn't available in this deployment, so I'll start with {}.",
                        capitalize(original.label()),
                        IntentType::TerrainAnalysis.label()
                    ),
                ),
            };

            tracing::warn!(original = %original, fallback = %kind, "Capability unavailable, rerouting intent");

            intent.kind = kind;
            intent.confidence = confidence;
            intent.params.insert("original_intent".to_string(), Value::from(original.as_str()));

            return RoutedIntent {
                intent,
                requires_confirmation: true,
                confirmation_message: Some(message),
                alternatives: Vec::new(),
                original_intent: Some(original),
            };
        }

        if !classification.requires_confirmation {
            return RoutedIntent {
                intent,
                requires_confirmation: false,
                confirmation_message: None,
                alternatives: Vec::new(),
                original_intent: None,
            };
        }

        let alternatives: Vec<IntentAlternative> = intent
            .alternatives
            .iter()
            .filter(|a| a.confidence > MIN_ALTERNATIVE_CONFIDENCE)
            .copied()
            .collect();
        let message = confirmation_question(&intent, &alternatives);

        RoutedIntent {
            intent,
            requires_confirmation: true,
            confirmation_message: Some(message),
            alternatives,
            original_intent: None,
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Question phrased by confidence band
fn confirmation_question(intent: &Intent, alternatives: &[IntentAlternative]) -> String {
    let top = intent.kind.label();
    let alt_labels: Vec<&str> = alternatives.iter().map(|a| a.kind.label()).collect();

    if intent.confidence < 50 {
        let mut options = vec![top];
        options.extend(alt_labels);
        format!("I'm not sure what you'd like to do. Did you mean: {}?", options.join(", "))
    } else if intent.confidence < 70 {
        match alt_labels.first() {
            Some(alt) => format!("I think you want {}. Is that right, or did you mean {}?", top, alt),
            None => format!("I think you want {}. Is that right?", top),
        }
    } else {
        match alt_labels.first() {
            Some(alt) => format!("Did you mean {} or {}?", top, alt),
            None => format!("Did you mean {}?", top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core::models::Capability;

    fn all_capabilities() -> CapabilityConfig {
        CapabilityConfig::default()
            .with_function(Capability::Terrain, "terrain-fn")
            .with_function(Capability::Layout, "layout-fn")
            .with_function(Capability::Simulation, "simulation-fn")
            .with_function(Capability::Report, "report-fn")
    }

    fn router(capabilities: CapabilityConfig) -> IntentRouter {
        IntentRouter::new(Arc::new(IntentRegistry::standard()), capabilities)
    }

    #[test]
    fn test_routes_with_extracted_parameters() {
        let routed = router(all_capabilities()).route("analyze terrain at 35.067482, -101.395466");

        assert_eq!(routed.intent.kind, IntentType::TerrainAnalysis);
        assert!(!routed.requires_confirmation);
        assert_eq!(routed.intent.param_f64("latitude"), Some(35.067482));
        assert_eq!(routed.intent.param_f64("longitude"), Some(-101.395466));
    }

    #[test]
    fn test_unavailable_capability_falls_back_to_available_alternative() {
        let capabilities = CapabilityConfig::default().with_function(Capability::Terrain, "terrain-fn");
        let routed = router(capabilities).route("optimize layout at 35.06, -101.39");

        assert_eq!(routed.original_intent, Some(IntentType::LayoutOptimization));
        assert_eq!(routed.intent.kind, IntentType::TerrainAnalysis);
        assert_eq!(routed.intent.param_str("original_intent"), Some("layout_optimization"));
        assert!(routed.requires_confirmation);
        assert!(routed.confirmation_message.is_some());
    }

    #[test]
    fn test_no_available_alternative_defaults_to_terrain() {
        let capabilities = CapabilityConfig::default().with_function(Capability::Terrain, "terrain-fn");
        let routed = router(capabilities).route("generate a report");

        assert_eq!(routed.intent.kind, IntentType::TerrainAnalysis);
        assert_eq!(routed.intent.confidence, 50);
        assert_eq!(routed.original_intent, Some(IntentType::ReportGeneration));
    }

    #[test]
    fn test_lifecycle_intents_need_no_capability() {
        let routed = router(CapabilityConfig::default()).route("delete project alpha");
        assert_eq!(routed.intent.kind, IntentType::DeleteProject);
        assert!(routed.original_intent.is_none());
    }

    #[test]
    fn test_low_confidence_question() {
        let routed = router(all_capabilities()).route("hello there");
        assert!(routed.requires_confirmation);
        let message = routed.confirmation_message.unwrap();
        assert!(message.starts_with("I'm not sure"), "{}", message);
    }

    #[test]
    fn test_confirmation_bands() {
        let mut intent = Intent::new(IntentType::LayoutOptimization, 60);
        let alternatives =
            vec![IntentAlternative { kind: IntentType::TerrainAnalysis, confidence: 55 }];
        assert!(confirmation_question(&intent, &alternatives).starts_with("I think"));

        intent.confidence = 85;
        assert_eq!(
            confirmation_question(&intent, &alternatives),
            "Did you mean layout optimization or terrain analysis?"
        );
    }
}
