//! Centralized constants for the listing-locator crate
//!
//! This module consolidates constants that are used across multiple modules
//! to avoid duplication and ensure consistency.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in meters (WGS84 approximation)
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
}

/// External API endpoints
pub mod api {
    /// Hierarchy REST API root used when none is configured
    pub const CATALOG_URL: &str = "http://127.0.0.1:8080/api";

    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// User agent sent to every external service
    pub const USER_AGENT: &str = concat!("listing-locator/", env!("CARGO_PKG_VERSION"));
}
