use sitewise_core::error::{Result, SitewiseError};
use sitewise_core::models::Coordinates;

/// Largest radius accepted for proximity searches and duplicate checks
pub const MAX_SEARCH_RADIUS_KM: f64 = 1000.0;

/// Build a coordinate pair, rejecting out-of-range or non-finite values
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<Coordinates> {
    let coordinates = Coordinates::new(latitude, longitude);
    coordinates.validate()?;
    Ok(coordinates)
}

/// Check a proximity radius in kilometers
pub fn validate_search_radius(radius_km: f64) -> Result<f64> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(SitewiseError::InvalidSearchRadius {
            radius_km,
            reason: "radius must be a positive number".to_string(),
        });
    }

    if radius_km > MAX_SEARCH_RADIUS_KM {
        return Err(SitewiseError::InvalidSearchRadius {
            radius_km,
            reason: format!("radius must be at most {} km", MAX_SEARCH_RADIUS_KM),
        });
    }

    Ok(radius_km)
}
