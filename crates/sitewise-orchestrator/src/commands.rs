//! Deterministic parsing of special queries and lifecycle commands.
//!
//! Special queries (dashboard, listing, project details, a numbered reply to
//! a duplicate prompt) bypass classification entirely. Lifecycle commands
//! take their targets straight from the query text, falling back to the
//! resolved project for pronoun targets ("delete this project").

use chrono::{NaiveDate, TimeZone, Utc};
use regex::Regex;
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::IntentType;
use sitewise_core::naming::normalize_project_name;
use sitewise_intent::extract_coordinates;
use std::sync::LazyLock;

use crate::lifecycle::SearchFilters;

/// Radius for "projects near X" when the query names none
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

static DASHBOARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:show\s+(?:me\s+)?)?(?:my\s+)?(?:project\s+)?dashboard\s*$")
        .expect("valid dashboard regex")
});

static LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:list|show)\s+(?:me\s+)?(?:all\s+)?(?:of\s+)?(?:my\s+)?(?:renewable\s+|wind\s+(?:farm\s+)?)?projects\s*$",
    )
    .expect("valid list regex")
});

static DETAILS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:show|view|open)\s+(?:me\s+)?(?:the\s+)?project\s+([a-z0-9][a-z0-9\-]*)|project\s+([a-z0-9][a-z0-9\-]*)\s+details|details\s+(?:for|of)\s+(?:project\s+)?([a-z0-9][a-z0-9\-]*))\s*$",
    )
    .expect("valid details regex")
});

static CHOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:option\s+)?([1-9])\s*\.?\s*$").expect("valid choice regex"));

static BULK_DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:delete|remove)\s+all\s+(?:of\s+)?(?:the\s+)?projects\s+(?:matching|named|containing|like|with)\s+([a-z0-9][a-z0-9\-]*)")
        .expect("valid bulk delete regex")
});

static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:delete|remove|unarchive|archive|export)\s+(?:the\s+)?(?:project\s+)?([a-z0-9][a-z0-9\-]*)")
        .expect("valid target regex")
});

static RENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\brename\s+(?:(?:the|this|that|my)\s+)?(?:project\s+)?(?:([a-z0-9][a-z0-9\-]*)\s+)?(?:to|as)\s+(.+?)\s*$")
        .expect("valid rename regex")
});

static MERGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bmerge\s+(?:projects?\s+)?([a-z0-9][a-z0-9\-]*)\s+(and|with|into)\s+([a-z0-9][a-z0-9\-]*)(?:.*?\bkeep(?:ing)?\s+(?:the\s+)?(?:name\s+)?([a-z0-9][a-z0-9\-]*))?")
        .expect("valid merge regex")
});

static NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:named|matching|containing|called)\s+([a-z0-9][a-z0-9\-]*)").expect("valid named regex")
});

static CREATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcreated\s+(after|before|since)\s+(\d{4}-\d{2}-\d{2})").expect("valid created regex")
});

static WITHIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwithin\s+(-?\d+(?:\.\d+)?)\s*(?:km|kilometers?|kilometres?)\b").expect("valid within regex")
});

static INCOMPLETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:incomplete|unfinished|in[\s-]progress)\b").expect("valid incomplete regex")
});

static ARCHIVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\barchived\b").expect("valid archived regex"));

static NEW_SITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:new\s+(?:analysis|project|site)|start\s+fresh)\b").expect("valid new site regex")
});

/// Words standing for "the project we are talking about"
const PRONOUN_TARGETS: [&str; 6] = ["project", "it", "this", "that", "current", "my"];

/// Query handled before classification
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialQuery {
    Dashboard,
    ListProjects,
    ProjectDetails { name: String },
    /// Bare number, meaningful only while a duplicate prompt is pending
    DuplicateChoice(u8),
}

pub fn classify_special(query: &str) -> Option<SpecialQuery> {
    if let Some(caps) = CHOICE_RE.captures(query) {
        return caps[1].parse().ok().map(SpecialQuery::DuplicateChoice);
    }
    if DASHBOARD_RE.is_match(query) {
        return Some(SpecialQuery::Dashboard);
    }
    if LIST_RE.is_match(query) {
        return Some(SpecialQuery::ListProjects);
    }
    DETAILS_RE.captures(query).and_then(|caps| {
        let name = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
        Some(SpecialQuery::ProjectDetails { name: normalize_project_name(name.as_str()) })
    })
}

/// The query asks for a fresh project even if one exists nearby
pub fn wants_new_site(query: &str) -> bool {
    NEW_SITE_RE.is_match(query)
}

/// Delete target
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Project(String),
    Matching(String),
}

/// Lifecycle operation with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleCommand {
    Delete(DeleteTarget),
    Rename { from: String, to: String },
    Merge { first: String, second: String, keep: Option<String> },
    Archive { name: String },
    Unarchive { name: String },
    Export { name: String },
    Search(SearchFilters),
    Dashboard,
}

fn explicit_target(query: &str) -> Option<String> {
    let caps = TARGET_RE.captures(query)?;
    let target = caps[1].to_lowercase();
    (!PRONOUN_TARGETS.contains(&target.as_str())).then(|| normalize_project_name(&target))
}

fn target_or_resolved(query: &str, resolved: Option<&str>, action: &str) -> Result<String> {
    explicit_target(query)
        .or_else(|| resolved.map(str::to_string))
        .ok_or_else(|| SitewiseError::InvalidParameters(vec![format!("which project should I {}?", action)]))
}

fn parse_date(value: &str) -> Result<chrono::DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        SitewiseError::InvalidParameters(vec![format!("invalid date '{}': {}", value, e)])
    })?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        SitewiseError::InvalidParameters(vec![format!("invalid date '{}'", value)])
    })?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Search filters mentioned in the query; archived projects are excluded
/// unless the query asks for them.
pub fn parse_search_filters(query: &str) -> Result<SearchFilters> {
    let mut filters = SearchFilters {
        archived: Some(ARCHIVED_RE.is_match(query)),
        incomplete_only: INCOMPLETE_RE.is_match(query),
        ..Default::default()
    };

    if let Some(caps) = NAMED_RE.captures(query) {
        filters.name_contains = Some(normalize_project_name(&caps[1]));
    }

    for caps in CREATED_RE.captures_iter(query) {
        let date = parse_date(&caps[2])?;
        if caps[1].eq_ignore_ascii_case("before") {
            filters.created_before = Some(date);
        } else {
            filters.created_after = Some(date);
        }
    }

    if let Some(center) = extract_coordinates(query) {
        let radius = WITHIN_RE
            .captures(query)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .unwrap_or(DEFAULT_SEARCH_RADIUS_KM);
        filters.near = Some((center, radius));
    }

    Ok(filters)
}

/// Lifecycle command for a lifecycle intent; `resolved` stands in for
/// pronoun targets.
pub fn parse_lifecycle(kind: IntentType, query: &str, resolved: Option<&str>) -> Result<LifecycleCommand> {
    match kind {
        IntentType::DeleteProject => {
            if let Some(caps) = BULK_DELETE_RE.captures(query) {
                return Ok(LifecycleCommand::Delete(DeleteTarget::Matching(normalize_project_name(&caps[1]))));
            }
            target_or_resolved(query, resolved, "delete")
                .map(|name| LifecycleCommand::Delete(DeleteTarget::Project(name)))
        }
        IntentType::RenameProject => {
            let caps = RENAME_RE.captures(query).ok_or_else(|| {
                SitewiseError::InvalidParameters(vec![
                    "say it as \"rename <project> to <new name>\"".to_string(),
                ])
            })?;
            let from = caps
                .get(1)
                .map(|m| m.as_str().to_lowercase())
                .filter(|m| !PRONOUN_TARGETS.contains(&m.as_str()))
                .map(|m| normalize_project_name(&m))
                .or_else(|| resolved.map(str::to_string))
                .ok_or_else(|| {
                    SitewiseError::InvalidParameters(vec!["which project should I rename?".to_string()])
                })?;
            Ok(LifecycleCommand::Rename { from, to: caps[2].to_string() })
        }
        IntentType::MergeProjects => {
            let caps = MERGE_RE.captures(query).ok_or_else(|| {
                SitewiseError::InvalidParameters(vec![
                    "say it as \"merge projects <a> and <b> keep <a>\"".to_string(),
                ])
            })?;
            let first = normalize_project_name(&caps[1]);
            let second = normalize_project_name(&caps[3]);
            // "merge a into b": b survives
            let keep = match caps.get(4) {
                Some(keep) => Some(normalize_project_name(keep.as_str())),
                None if caps[2].eq_ignore_ascii_case("into") => Some(second.clone()),
                None => None,
            };
            Ok(LifecycleCommand::Merge { first, second, keep })
        }
        IntentType::ArchiveProject => {
            target_or_resolved(query, resolved, "archive").map(|name| LifecycleCommand::Archive { name })
        }
        IntentType::UnarchiveProject => {
            target_or_resolved(query, resolved, "unarchive").map(|name| LifecycleCommand::Unarchive { name })
        }
        IntentType::ExportProject => {
            target_or_resolved(query, resolved, "export").map(|name| LifecycleCommand::Export { name })
        }
        IntentType::SearchProjects => parse_search_filters(query).map(LifecycleCommand::Search),
        IntentType::ProjectDashboard => Ok(LifecycleCommand::Dashboard),
        IntentType::TerrainAnalysis
        | IntentType::LayoutOptimization
        | IntentType::WakeSimulation
        | IntentType::WindRose
        | IntentType::ReportGeneration
        | IntentType::FinancialAnalysis => Err(SitewiseError::InvalidParameters(vec![format!(
            "{} is not a project management command",
            kind.label()
        )])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core::models::Coordinates;

    #[test]
    fn test_special_queries() {
        assert_eq!(classify_special("show my project dashboard"), Some(SpecialQuery::Dashboard));
        assert_eq!(classify_special("list my renewable projects"), Some(SpecialQuery::ListProjects));
        assert_eq!(
            classify_special("show project west-texas-wind-farm"),
            Some(SpecialQuery::ProjectDetails { name: "west-texas-wind-farm".into() })
        );
        assert_eq!(
            classify_special("project abilene-wind-farm details"),
            Some(SpecialQuery::ProjectDetails { name: "abilene-wind-farm".into() })
        );
        assert_eq!(classify_special(" 2 "), Some(SpecialQuery::DuplicateChoice(2)));
        assert_eq!(classify_special("analyze terrain at 35.0, -101.4"), None);
        assert_eq!(classify_special("list projects near 35.0, -101.4"), None);
    }

    #[test]
    fn test_delete_targets() {
        assert_eq!(
            parse_lifecycle(IntentType::DeleteProject, "delete project abilene-wind-farm", None).unwrap(),
            LifecycleCommand::Delete(DeleteTarget::Project("abilene-wind-farm".into()))
        );
        assert_eq!(
            parse_lifecycle(IntentType::DeleteProject, "delete all projects matching texas", None).unwrap(),
            LifecycleCommand::Delete(DeleteTarget::Matching("texas".into()))
        );
        assert_eq!(
            parse_lifecycle(IntentType::DeleteProject, "delete this project", Some("amarillo-wind-farm")).unwrap(),
            LifecycleCommand::Delete(DeleteTarget::Project("amarillo-wind-farm".into()))
        );
        assert!(parse_lifecycle(IntentType::DeleteProject, "delete the project", None).is_err());
    }

    #[test]
    fn test_rename_and_merge() {
        assert_eq!(
            parse_lifecycle(IntentType::RenameProject, "rename old-site to West Texas Site", None).unwrap(),
            LifecycleCommand::Rename { from: "old-site".into(), to: "West Texas Site".into() }
        );
        assert_eq!(
            parse_lifecycle(IntentType::RenameProject, "rename this project to texas-2", Some("texas-1"))
                .unwrap(),
            LifecycleCommand::Rename { from: "texas-1".into(), to: "texas-2".into() }
        );
        assert_eq!(
            parse_lifecycle(IntentType::MergeProjects, "merge projects site-a and site-b keep site-b", None)
                .unwrap(),
            LifecycleCommand::Merge {
                first: "site-a".into(),
                second: "site-b".into(),
                keep: Some("site-b".into())
            }
        );
        assert_eq!(
            parse_lifecycle(IntentType::MergeProjects, "merge site-a into site-b", None).unwrap(),
            LifecycleCommand::Merge { first: "site-a".into(), second: "site-b".into(), keep: Some("site-b".into()) }
        );
        assert_eq!(
            parse_lifecycle(IntentType::MergeProjects, "merge site-a with site-b", None).unwrap(),
            LifecycleCommand::Merge { first: "site-a".into(), second: "site-b".into(), keep: None }
        );
    }

    #[test]
    fn test_search_filters() {
        let filters =
            parse_search_filters("find incomplete projects near 35.0, -101.4 within 25 km created after 2024-01-01")
                .unwrap();

        assert!(filters.incomplete_only);
        assert_eq!(filters.archived, Some(false));
        assert_eq!(filters.near, Some((Coordinates::new(35.0, -101.4), 25.0)));
        assert_eq!(filters.created_after.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let archived = parse_search_filters("show archived projects named texas").unwrap();
        assert_eq!(archived.archived, Some(true));
        assert_eq!(archived.name_contains.as_deref(), Some("texas"));
    }

    #[test]
    fn test_new_site_phrasing() {
        assert!(wants_new_site("start a new analysis at 32.45, -99.73"));
        assert!(!wants_new_site("analyze terrain at 32.45, -99.73"));
    }
}
