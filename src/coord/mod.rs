//! Geographic points and their provenance
//!
//! Every point the form holds remembers where it came from: the device,
//! a click on the map, or the reverse geocoder's own coordinate for an
//! address.

pub mod point;

use serde::{Deserialize, Serialize};

/// A geographic coordinate (latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Create new coordinates
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validate that coordinates are within valid ranges
    ///
    /// Latitude: -90 to 90
    /// Longitude: -180 to 180
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(crate::error::Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(crate::error::Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Where a point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    /// Reported by the device position capability
    Device,
    /// Picked by the user on the map
    Manual,
    /// Coordinate of the address returned by the reverse geocoder
    Geocoded,
}

impl std::fmt::Display for PointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Manual => write!(f, "manual"),
            Self::Geocoded => write!(f, "geocoded"),
        }
    }
}

/// A point tagged with its source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(flatten)]
    pub coords: Coordinates,
    pub source: PointSource,
}

impl GeoPoint {
    pub fn new(coords: Coordinates, source: PointSource) -> Self {
        Self { coords, source }
    }

    pub fn device(lat: f64, lng: f64) -> Self {
        Self::new(Coordinates::new(lat, lng), PointSource::Device)
    }

    pub fn manual(lat: f64, lng: f64) -> Self {
        Self::new(Coordinates::new(lat, lng), PointSource::Manual)
    }

    pub fn geocoded(lat: f64, lng: f64) -> Self {
        Self::new(Coordinates::new(lat, lng), PointSource::Geocoded)
    }

    pub fn lat(&self) -> f64 {
        self.coords.lat
    }

    pub fn lng(&self) -> f64 {
        self.coords.lng
    }
}
