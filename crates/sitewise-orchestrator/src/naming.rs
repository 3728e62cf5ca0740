//! Project names for new sites

use regex::Regex;
use sitewise_core::error::Result;
use sitewise_core::models::Coordinates;
use sitewise_core::naming::{normalize_project_name, unique_name};
use sitewise_invoke::Geocoder;
use sitewise_store::ProjectStore;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

static NAMED_SITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+){0,3})\s+[Ww]ind\s+[Ff]arm\b")
        .expect("valid named site regex")
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|near|at|for)\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+){0,3})")
        .expect("valid location regex")
});

const NAME_SUFFIX: &str = "wind-farm";

/// Derive a site name from the query text: "Abilene wind farm" or "near Abilene"
pub fn name_from_query(query: &str) -> Option<String> {
    let location = NAMED_SITE_RE
        .captures(query)
        .or_else(|| LOCATION_RE.captures(query))
        .map(|caps| caps[1].to_string())?;

    let base = normalize_project_name(&location);
    (!base.is_empty()).then(|| format!("{}-{}", base, NAME_SUFFIX))
}

/// Coordinate-based name, e.g. `site-35-067n-101-395w`
pub fn name_from_coordinates(coordinates: &Coordinates) -> String {
    let ns = if coordinates.latitude >= 0.0 { 'n' } else { 's' };
    let ew = if coordinates.longitude >= 0.0 { 'e' } else { 'w' };
    normalize_project_name(&format!(
        "site {:.3}{} {:.3}{}",
        coordinates.latitude.abs(),
        ns,
        coordinates.longitude.abs(),
        ew
    ))
}

/// Generates unique names for new projects
pub struct ProjectNameGenerator {
    store: Arc<ProjectStore>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl ProjectNameGenerator {
    pub fn new(store: Arc<ProjectStore>, geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self { store, geocoder }
    }

    /// Name from the query, else the reverse-geocoded locality, else the
    /// coordinates; made unique against stored projects with `-2`, `-3`, …
    pub async fn generate(&self, query: &str, coordinates: Option<&Coordinates>) -> Result<String> {
        let mut base = name_from_query(query);

        if base.is_none() {
            if let (Some(geocoder), Some(coordinates)) = (&self.geocoder, coordinates) {
                match geocoder.reverse_geocode(coordinates).await {
                    Ok(Some(locality)) => {
                        let locality = normalize_project_name(&locality);
                        if !locality.is_empty() {
                            base = Some(format!("{}-{}", locality, NAME_SUFFIX));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "Reverse geocoding failed, using coordinates"),
                }
            }
        }

        let base = base
            .or_else(|| coordinates.map(name_from_coordinates))
            .unwrap_or_else(|| format!("new-{}", NAME_SUFFIX));

        let taken: HashSet<String> = self.store.list_names().await?.into_iter().collect();
        Ok(unique_name(&base, |candidate| taken.contains(candidate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sitewise_core::config::CacheConfig;
    use proptest::prelude::*;
    use sitewise_core::models::ProjectUpdate;
    use sitewise_core::naming::validate_project_name;
    use sitewise_core::retry::RetryPolicy;
    use sitewise_store::MemoryObjectStore;

    struct FixedGeocoder(Option<&'static str>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _: &Coordinates) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    fn store() -> Arc<ProjectStore> {
        Arc::new(ProjectStore::new(
            Arc::new(MemoryObjectStore::new()),
            CacheConfig::default(),
            RetryPolicy::immediate(1),
        ))
    }

    #[test]
    fn test_name_from_query() {
        assert_eq!(
            name_from_query("analyze the West Texas wind farm at 35.0, -101.4").as_deref(),
            Some("west-texas-wind-farm")
        );
        assert_eq!(
            name_from_query("analyze terrain near Abilene").as_deref(),
            Some("abilene-wind-farm")
        );
        assert_eq!(name_from_query("analyze terrain at 35.0, -101.4"), None);
    }

    #[test]
    fn test_name_from_coordinates() {
        assert_eq!(
            name_from_coordinates(&Coordinates::new(35.067482, -101.395466)),
            "site-35-067n-101-395w"
        );
    }

    proptest! {
        #[test]
        fn prop_coordinate_names_are_valid_project_names(
            latitude in -90.0f64..=90.0,
            longitude in -180.0f64..=180.0,
        ) {
            let name = name_from_coordinates(&Coordinates::new(latitude, longitude));
            prop_assert!(name.starts_with("site-"));
            prop_assert_eq!(validate_project_name(&name).unwrap(), name);
        }
    }

    #[tokio::test]
    async fn test_generate_uses_geocoder_and_stays_unique() {
        let store = store();
        store.save("amarillo-wind-farm", ProjectUpdate::new()).await.unwrap();

        let generator =
            ProjectNameGenerator::new(store, Some(Arc::new(FixedGeocoder(Some("Amarillo")))));
        let name = generator
            .generate("analyze terrain at 35.2, -101.8", Some(&Coordinates::new(35.2, -101.8)))
            .await
            .unwrap();

        assert_eq!(name, "amarillo-wind-farm-2");
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_coordinates() {
        let generator = ProjectNameGenerator::new(store(), Some(Arc::new(FixedGeocoder(None))));
        let coordinates = Coordinates::new(35.067482, -101.395466);
        let name = generator
            .generate("analyze terrain at 35.067482, -101.395466", Some(&coordinates))
            .await
            .unwrap();

        assert_eq!(name, "site-35-067n-101-395w");
    }
}
