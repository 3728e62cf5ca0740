//! Sitewise Geo - Proximity and coordinate operations
//!
//! Great-circle distances between project sites, radius queries used for
//! duplicate detection and search, proximity clustering, coordinate checks,
//! and GeoJSON rendering of project locations.

pub mod map;
pub mod spatial;
pub mod validation;

pub use spatial::{find_within_radius, group_by_proximity, haversine_distance_km, within_radius};
pub use validation::{validate_coordinates, validate_search_radius, MAX_SEARCH_RADIUS_KM};
