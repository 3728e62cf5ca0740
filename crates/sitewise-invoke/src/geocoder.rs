//! Reverse geocoding for project naming

use async_trait::async_trait;
use serde::Deserialize;
use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::Coordinates;
use std::time::Duration;

use crate::ports::Geocoder;

/// Nominatim-compatible reverse geocoder
pub struct NominatimGeocoder {
    /// Base URL (e.g., "https://nominatim.openstreetmap.org")
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    fn reverse_url(&self, coordinates: &Coordinates) -> String {
        format!(
            "{}/reverse?format=json&lat={}&lon={}",
            self.base_url, coordinates.latitude, coordinates.longitude
        )
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

impl Address {
    /// Most specific locality available
    fn locality(self) -> Option<String> {
        self.city.or(self.town).or(self.village).or(self.county).or(self.state)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.reverse_url(coordinates))
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, concat!("sitewise/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| SitewiseError::CapabilityFailed {
                function: "geocoder".to_string(),
                reason: e.to_string(),
                transient: e.is_timeout() || e.is_connect(),
            })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Reverse geocoding returned no result");
            return Ok(None);
        }

        let body: ReverseResponse = response.json().await.map_err(|e| {
            SitewiseError::Serialization(format!("Failed to parse geocoder response: {}", e))
        })?;

        Ok(body.address.and_then(Address::locality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reverse_geocode_prefers_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": {"city": "Abilene", "county": "Taylor County", "state": "Texas"}
            })))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(server.uri());
        let name = geocoder.reverse_geocode(&Coordinates::new(32.45, -99.73)).await.unwrap();
        assert_eq!(name.as_deref(), Some("Abilene"));
    }

    #[tokio::test]
    async fn test_reverse_geocode_without_address() {
        let server = MockServer::start().await;
        Mock::given(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(server.uri());
        let name = geocoder.reverse_geocode(&Coordinates::new(0.0, -140.0)).await.unwrap();
        assert!(name.is_none());
    }
}
