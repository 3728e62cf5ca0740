//! Parameter extraction from free-text queries

use regex::Regex;
use serde_json::{Map, Value};
use sitewise_core::models::Coordinates;
use std::sync::LazyLock;

static COORDINATE_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d{1,3}\.\d+)\s*°?\s*,\s*(-?\d{1,3}\.\d+)").expect("valid coordinate regex")
});

static CAPACITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:mw|megawatts?)\b").expect("valid capacity regex")
});

static TURBINES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+(?:wind\s+)?turbines?\b").expect("valid turbine regex")
});

static RADIUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:km|kilometers?|kilometres?)\b").expect("valid radius regex")
});

static WIND_SPEED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:m/s|mps|meters per second)").expect("valid wind speed regex")
});

static WAKE_MODEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(jensen|larsen|bastankhah)\b").expect("valid wake model regex")
});

static LAYOUT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(grid|offset|greedy)\s+(?:layout|pattern|arrangement)\b")
        .expect("valid layout type regex")
});

static FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:as|in|to)\s+(?:an?\s+)?(pdf|html|json)\b|\b(pdf|html|json)\s+(?:report|format|file)\b")
        .expect("valid format regex")
});

/// First in-range "latitude, longitude" pair in the query
pub fn extract_coordinates(query: &str) -> Option<Coordinates> {
    COORDINATE_PAIR_RE.captures_iter(query).find_map(|caps| {
        let latitude: f64 = caps[1].parse().ok()?;
        let longitude: f64 = caps[2].parse().ok()?;
        let coordinates = Coordinates::new(latitude, longitude);
        coordinates.validate().ok().map(|_| coordinates)
    })
}

pub fn has_coordinates(query: &str) -> bool {
    extract_coordinates(query).is_some()
}

fn first_number(re: &Regex, query: &str) -> Option<f64> {
    re.captures(query).and_then(|caps| caps[1].parse().ok())
}

/// Analysis parameters mentioned in the query
pub fn extract_parameters(query: &str) -> Map<String, Value> {
    let mut params = Map::new();

    if let Some(coordinates) = extract_coordinates(query) {
        params.insert("latitude".to_string(), coordinates.latitude.into());
        params.insert("longitude".to_string(), coordinates.longitude.into());
    }

    if let Some(capacity) = first_number(&CAPACITY_RE, query) {
        params.insert("capacity_mw".to_string(), capacity.into());
    }

    if let Some(turbines) = TURBINES_RE.captures(query).and_then(|c| c[1].parse::<u64>().ok()) {
        params.insert("num_turbines".to_string(), turbines.into());
    }

    if let Some(radius) = first_number(&RADIUS_RE, query) {
        params.insert("radius_km".to_string(), radius.into());
    }

    if let Some(speed) = first_number(&WIND_SPEED_RE, query) {
        params.insert("wind_speed".to_string(), speed.into());
    }

    if let Some(caps) = WAKE_MODEL_RE.captures(query) {
        params.insert("wake_model".to_string(), caps[1].to_lowercase().into());
    }

    if let Some(caps) = LAYOUT_TYPE_RE.captures(query) {
        params.insert("layout_type".to_string(), caps[1].to_lowercase().into());
    }

    if let Some(caps) = FORMAT_RE.captures(query) {
        if let Some(format) = caps.get(1).or_else(|| caps.get(2)) {
            params.insert("format".to_string(), format.as_str().to_lowercase().into());
        }
    }

    params
}
