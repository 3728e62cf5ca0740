//! Project reference resolution.
//!
//! Strict priority order, first success wins: explicit name, implicit
//! session reference, fuzzy fragment match, session active project, none.
//! Ambiguous outcomes are returned as such and never collapsed to a winner.

use regex::Regex;
use serde::Serialize;
use sitewise_core::models::SessionContext;
use sitewise_core::naming::normalize_project_name;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::extract::has_coordinates;

const MIN_FRAGMENT_LEN: usize = 3;
const WINNER_MARGIN: u32 = 20;
const AMBIGUITY_WINDOW: u32 = 10;

static EXPLICIT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bfor project\s+([a-z0-9][a-z0-9_-]*)",
        r"\bfor\s+(?:the\s+)?([a-z0-9][a-z0-9_-]*)\s+project\b",
        r"\bproject\s+(?:named\s+|called\s+)?([a-z0-9][a-z0-9_-]*)",
    ]
    .iter()
    .map(|source| Regex::new(source).expect("valid explicit reference regex"))
    .collect()
});

static THAT_PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bthat project\b").expect("valid implicit regex"));

static ACTIVE_PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(the project|this project|continue)\b").expect("valid implicit regex"));

static WIND_FARM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:[a-z0-9-]+\s+){0,2}[a-z0-9-]+)\s+wind\s+farm\b").expect("valid wind farm regex")
});

static PREPOSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|at|near|for)\s+(?:the\s+)?([a-z0-9-]+)(?:\s+([a-z0-9-]+))?")
        .expect("valid preposition regex")
});

static CAPITALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*\b").expect("valid capitalized regex")
});

static HYPHENATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z0-9]+(?:-[a-z0-9]+)+\b").expect("valid hyphenated regex")
});

/// Words that never name a project on their own
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "this", "that", "it", "for", "in", "at", "near", "on", "of", "to",
    "and", "with", "data", "details", "status", "results", "analysis", "project", "projects",
    "wind", "farm", "site", "new", "all", "me", "please", "show", "run", "analyze", "optimize",
    "generate", "create", "layout", "terrain", "simulation", "report", "wake",
];

/// Capitalized words that start commands rather than names
const COMMAND_WORDS: &[&str] = &[
    "analyze", "analyse", "show", "run", "optimize", "generate", "create", "delete", "rename",
    "merge", "archive", "unarchive", "export", "search", "find", "list", "continue", "please",
    "what", "how", "can", "i", "the", "my", "project",
];

/// How a project reference was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionConfidence {
    Explicit,
    Implicit,
    Partial,
    Active,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub project_name: Option<String>,
    pub confidence: ResolutionConfidence,
    pub is_ambiguous: bool,
    /// Candidate names when ambiguous
    pub matches: Vec<String>,
}

impl ResolutionResult {
    fn resolved(name: &str, confidence: ResolutionConfidence) -> Self {
        Self {
            project_name: Some(name.to_string()),
            confidence,
            is_ambiguous: false,
            matches: Vec::new(),
        }
    }

    fn ambiguous(matches: Vec<String>, confidence: ResolutionConfidence) -> Self {
        Self { project_name: None, confidence, is_ambiguous: true, matches }
    }

    pub fn none() -> Self {
        Self {
            project_name: None,
            confidence: ResolutionConfidence::None,
            is_ambiguous: false,
            matches: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.project_name.is_some()
    }
}

pub struct ProjectResolver {
    similarity_threshold: f64,
}

impl Default for ProjectResolver {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl ProjectResolver {
    pub fn new(similarity_threshold: f64) -> Self {
        Self { similarity_threshold }
    }

    /// Resolve which of `known_names` the query refers to
    pub fn resolve(
        &self,
        query: &str,
        session: Option<&SessionContext>,
        known_names: &[String],
    ) -> ResolutionResult {
        let lowered = query.to_lowercase();

        if let Some(result) = self.explicit_reference(&lowered, known_names) {
            return result;
        }

        if let Some(result) = implicit_reference(&lowered, session) {
            return result;
        }

        if has_coordinates(query) {
            tracing::debug!("Query carries coordinates, skipping fuzzy project match");
        } else if let Some(result) = self.fuzzy_match(query, known_names) {
            return result;
        }

        if let Some(active) = session.and_then(|s| s.active_project.as_deref()) {
            return ResolutionResult::resolved(active, ResolutionConfidence::Active);
        }

        ResolutionResult::none()
    }

    fn explicit_reference(&self, lowered: &str, known_names: &[String]) -> Option<ResolutionResult> {
        let mut found: Vec<String> = Vec::new();

        for re in EXPLICIT_RES.iter() {
            for caps in re.captures_iter(lowered) {
                let candidate = &caps[1];
                if STOPWORDS.contains(&candidate) {
                    continue;
                }
                let normalized = normalize_project_name(candidate);
                if known_names.iter().any(|n| *n == normalized) && !found.contains(&normalized) {
                    found.push(normalized);
                }
            }
        }

        match found.len() {
            0 => None,
            1 => Some(ResolutionResult::resolved(&found[0], ResolutionConfidence::Explicit)),
            _ => Some(ResolutionResult::ambiguous(found, ResolutionConfidence::Explicit)),
        }
    }

    fn fuzzy_match(&self, query: &str, known_names: &[String]) -> Option<ResolutionResult> {
        let fragments = extract_fragments(query);
        if fragments.is_empty() {
            return None;
        }

        let mut scored: Vec<(String, u32)> = known_names
            .iter()
            .filter_map(|name| {
                let best = fragments
                    .iter()
                    .map(|fragment| self.score(name, fragment))
                    .max()
                    .unwrap_or(0);
                (best > 0).then(|| (name.clone(), best))
            })
            .collect();

        if scored.is_empty() {
            return None;
        }

        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let top = scored[0].1;
        let runner_up = scored.get(1).map_or(0, |s| s.1);

        tracing::debug!(?fragments, top, runner_up, "Scored fuzzy project matches");

        if top - runner_up > WINNER_MARGIN {
            return Some(ResolutionResult::resolved(&scored[0].0, ResolutionConfidence::Partial));
        }

        let mut close: Vec<String> = scored
            .into_iter()
            .filter(|(_, score)| top - score <= AMBIGUITY_WINDOW)
            .map(|(name, _)| name)
            .collect();
        close.dedup();

        if close.len() == 1 {
            Some(ResolutionResult::resolved(&close[0], ResolutionConfidence::Partial))
        } else {
            Some(ResolutionResult::ambiguous(close, ResolutionConfidence::Partial))
        }
    }

    /// Match strength of `fragment` against a normalized project name
    pub fn score(&self, name: &str, fragment: &str) -> u32 {
        if name == fragment {
            return 100;
        }
        if name.starts_with(fragment) {
            return 90;
        }
        if format!("-{}-", name).contains(&format!("-{}-", fragment)) {
            return 80;
        }
        if name.contains(fragment) {
            return 70;
        }

        let fragment_words: Vec<&str> = fragment.split('-').filter(|w| !w.is_empty()).collect();
        let name_words: Vec<&str> = name.split('-').collect();
        let matched = fragment_words
            .iter()
            .filter(|fw| fw.len() >= MIN_FRAGMENT_LEN && name_words.iter().any(|nw| nw.starts_with(*fw)))
            .count();
        if matched > 0 {
            let ratio = matched as f64 / fragment_words.len() as f64;
            return 50 + (20.0 * ratio).round() as u32;
        }

        let similarity = strsim::normalized_levenshtein(name, fragment);
        if similarity > self.similarity_threshold {
            return (similarity * 60.0).round() as u32;
        }

        0
    }
}

fn implicit_reference(lowered: &str, session: Option<&SessionContext>) -> Option<ResolutionResult> {
    let session = session?;

    if THAT_PROJECT_RE.is_match(lowered) {
        if let Some(recent) = session.most_recent_project() {
            return Some(ResolutionResult::resolved(recent, ResolutionConfidence::Implicit));
        }
    }

    if ACTIVE_PROJECT_RE.is_match(lowered) {
        if let Some(active) = session.active_project.as_deref() {
            return Some(ResolutionResult::resolved(active, ResolutionConfidence::Implicit));
        }
    }

    None
}

fn strip_leading_stopwords(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .skip_while(|w| STOPWORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Candidate name fragments mentioned in the query, normalized and deduplicated
pub fn extract_fragments(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut raw: Vec<String> = Vec::new();

    for caps in WIND_FARM_RE.captures_iter(&lowered) {
        raw.push(strip_leading_stopwords(&caps[1]));
    }

    for caps in PREPOSITION_RE.captures_iter(&lowered) {
        let first = &caps[1];
        if let Some(second) = caps.get(2) {
            raw.push(format!("{} {}", first, second.as_str()));
        }
        raw.push(first.to_string());
    }

    for m in CAPITALIZED_RE.find_iter(query) {
        let words: Vec<&str> = m
            .as_str()
            .split_whitespace()
            .filter(|w| !COMMAND_WORDS.contains(&w.to_lowercase().as_str()))
            .collect();
        if !words.is_empty() {
            raw.push(words.join(" "));
        }
    }

    for m in HYPHENATED_RE.find_iter(&lowered) {
        raw.push(m.as_str().to_string());
    }

    let mut seen = BTreeMap::new();
    let mut fragments = Vec::new();
    for phrase in raw {
        let normalized = normalize_project_name(&phrase);
        let only_stopwords = normalized.split('-').all(|w| STOPWORDS.contains(&w));
        if normalized.len() < MIN_FRAGMENT_LEN || only_stopwords {
            continue;
        }
        if seen.insert(normalized.clone(), ()).is_none() {
            fragments.push(normalized);
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_reference() {
        let resolver = ProjectResolver::default();
        let known = names(&["abilene-wind-farm", "amarillo-wind-farm"]);

        let result = resolver.resolve("optimize layout for project abilene-wind-farm", None, &known);
        assert_eq!(result.project_name.as_deref(), Some("abilene-wind-farm"));
        assert_eq!(result.confidence, ResolutionConfidence::Explicit);

        let result = resolver.resolve("run simulation for the amarillo-wind-farm project", None, &known);
        assert_eq!(result.project_name.as_deref(), Some("amarillo-wind-farm"));
        assert_eq!(result.confidence, ResolutionConfidence::Explicit);
    }

    #[test]
    fn test_unknown_explicit_name_falls_through() {
        let resolver = ProjectResolver::default();
        let result = resolver.resolve("show project west-texas-wind-farm", None, &[]);
        assert_eq!(result, ResolutionResult::none());
    }

    #[test]
    fn test_implicit_references_use_session() {
        let resolver = ProjectResolver::default();
        let mut session = SessionContext::new("s", Duration::hours(1));
        session.set_active_project("alpha-site");
        session.add_to_history("beta-site");

        let known = names(&["alpha-site", "beta-site"]);

        let result = resolver.resolve("run a report on that project", Some(&session), &known);
        assert_eq!(result.project_name.as_deref(), Some("beta-site"));
        assert_eq!(result.confidence, ResolutionConfidence::Implicit);

        let result = resolver.resolve("continue", Some(&session), &known);
        assert_eq!(result.project_name.as_deref(), Some("alpha-site"));
    }

    #[test]
    fn test_fuzzy_prefix_match() {
        let resolver = ProjectResolver::default();
        let known = names(&["abilene-wind-farm", "amarillo-wind-farm"]);

        let result = resolver.resolve("optimize the layout for Abilene", None, &known);
        assert_eq!(result.project_name.as_deref(), Some("abilene-wind-farm"));
        assert_eq!(result.confidence, ResolutionConfidence::Partial);
    }

    #[test]
    fn test_close_fuzzy_scores_are_ambiguous() {
        let resolver = ProjectResolver::default();
        let known = names(&["abilene-wind-farm", "abilene-wind-farm-2"]);

        let result = resolver.resolve("run simulation for Abilene wind farm", None, &known);
        assert!(result.is_ambiguous);
        assert!(result.project_name.is_none());
        assert_eq!(result.matches, known);
    }

    #[test]
    fn test_coordinates_skip_fuzzy_matching() {
        let resolver = ProjectResolver::default();
        let known = names(&["abilene-wind-farm"]);

        let result = resolver.resolve("analyze terrain near Abilene at 32.45, -99.73", None, &known);
        assert_eq!(result.confidence, ResolutionConfidence::None);
    }

    #[test]
    fn test_session_fallback() {
        let resolver = ProjectResolver::default();
        let mut session = SessionContext::new("s", Duration::hours(1));
        session.set_active_project("alpha-site");

        let result = resolver.resolve("generate a report", Some(&session), &names(&["alpha-site"]));
        assert_eq!(result.project_name.as_deref(), Some("alpha-site"));
        assert_eq!(result.confidence, ResolutionConfidence::Active);
    }

    #[test]
    fn test_scores() {
        let resolver = ProjectResolver::default();
        assert_eq!(resolver.score("abilene-wind-farm", "abilene-wind-farm"), 100);
        assert_eq!(resolver.score("abilene-wind-farm", "abilene"), 90);
        assert_eq!(resolver.score("west-abilene-site", "abilene"), 80);
        assert_eq!(resolver.score("westabilene-site", "abilene"), 70);
        assert_eq!(resolver.score("abilene-wind-farm", "abil-north"), 60);
        assert_eq!(resolver.score("abilene-wind-farm", "abi-wind"), 70);
        assert_eq!(resolver.score("sweetwater", "sweetwatr"), 54);
        assert_eq!(resolver.score("xyz", "qrs"), 0);
    }

    #[test]
    fn test_extract_fragments() {
        let fragments = extract_fragments("Show the Sweetwater wind farm");
        assert!(fragments.contains(&"sweetwater".to_string()));

        let fragments = extract_fragments("run report for panhandle-east");
        assert!(fragments.contains(&"panhandle-east".to_string()));

        assert!(extract_fragments("analyze the wind farm for the site").is_empty());
    }
}
