//! Project name normalization
//!
//! Project names are the sole external identity of a project: they address the
//! stored record and are what users type. Every name entering the system goes
//! through [`normalize_project_name`].

use crate::error::{Result, SitewiseError};

/// Maximum length of a normalized project name
pub const MAX_PROJECT_NAME_LEN: usize = 100;

/// Lowercase, hyphen-separated, no leading/trailing or repeated hyphens.
pub fn normalize_project_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !normalized.is_empty() {
                normalized.push('-');
            }
            pending_hyphen = false;
            normalized.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    normalized
}

/// Validate a project name supplied by a user (after normalization)
pub fn validate_project_name(name: &str) -> Result<String> {
    let normalized = normalize_project_name(name);

    if normalized.is_empty() {
        return Err(SitewiseError::InvalidProjectName {
            name: name.to_string(),
            reason: "name must contain at least one letter or digit".to_string(),
        });
    }

    if normalized.len() > MAX_PROJECT_NAME_LEN {
        return Err(SitewiseError::InvalidProjectName {
            name: name.to_string(),
            reason: format!("name must be at most {} characters", MAX_PROJECT_NAME_LEN),
        });
    }

    Ok(normalized)
}

/// First of `base`, `base-2`, `base-3`, … for which `taken` returns false
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }

    let mut counter = 2;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize_project_name("West Texas Wind Farm"), "west-texas-wind-farm");
        assert_eq!(normalize_project_name("  --Abilene__Site 2-- "), "abilene-site-2");
        assert_eq!(normalize_project_name("already-normal"), "already-normal");
        assert_eq!(normalize_project_name("!!!"), "");
    }

    #[test]
    fn test_validate_project_name() {
        assert_eq!(validate_project_name("My Site").unwrap(), "my-site");
        assert!(validate_project_name("???").is_err());
        assert!(validate_project_name(&"a".repeat(MAX_PROJECT_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_unique_name_suffixes() {
        let existing = ["site", "site-2"];
        assert_eq!(unique_name("site", |n| existing.contains(&n)), "site-3");
        assert_eq!(unique_name("other", |n| existing.contains(&n)), "other");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(input in ".{0,64}") {
            let once = normalize_project_name(&input);
            prop_assert_eq!(normalize_project_name(&once), once.clone());
        }

        #[test]
        fn prop_normalized_shape(input in ".{0,64}") {
            let name = normalize_project_name(&input);
            prop_assert!(!name.starts_with('-') && !name.ends_with('-'));
            prop_assert!(!name.contains("--"));
            prop_assert!(name.chars().all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
