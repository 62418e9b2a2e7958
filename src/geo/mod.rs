//! Device position and reverse geocoding
//!
//! The device position capability is modelled as a [`PositionSource`]
//! wrapped by [`position::GeoPositionProvider`], which owns the timeout and
//! maximum-age rules. Reverse geocoding goes through [`ReverseGeocoder`].

pub mod ip_location;
pub mod nominatim;
pub mod position;

use crate::coord::{Coordinates, GeoPoint};
use crate::config::GeolocationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub use nominatim::{RawAddress, ReverseGeocodeClient};
pub use position::{DeniedPositionSource, FixedPositionSource, GeoPositionProvider};

/// Why the device position could not be determined
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoError {
    #[error("permission to read the device location was denied")]
    PermissionDenied,

    #[error("device location is unavailable")]
    PositionUnavailable,

    #[error("timed out waiting for the device location")]
    Timeout,
}

/// Options passed to the position capability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Accept a cached fix no older than this; zero forces a fresh query
    pub max_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::from(&GeolocationConfig::default())
    }
}

impl From<&GeolocationConfig> for PositionOptions {
    fn from(config: &GeolocationConfig) -> Self {
        Self {
            high_accuracy: config.high_accuracy,
            timeout: Duration::from_millis(config.timeout_ms),
            max_age: Duration::from_millis(config.max_age_ms),
        }
    }
}

/// A single reading from the position capability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub coords: Coordinates,
    /// Radius of uncertainty in meters, when the source reports one
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn now(coords: Coordinates, accuracy_m: Option<f64>) -> Self {
        Self {
            coords,
            accuracy_m,
            timestamp: Utc::now(),
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coords, crate::coord::PointSource::Device)
    }
}

/// The platform capability that reports where the device is
///
/// Implementations must be thread-safe (Send + Sync) so a query can run on
/// a spawned task.
pub trait PositionSource: Send + Sync {
    /// Query the current position once
    fn query(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = std::result::Result<PositionFix, GeoError>> + Send;
}

/// Trait for reverse geocoding backends
pub trait ReverseGeocoder: Send + Sync {
    /// Look up the address at a point
    ///
    /// Never fails: any network or parse problem yields `None`, which callers
    /// treat as "fill the form by hand".
    fn lookup(&self, point: GeoPoint) -> impl Future<Output = Option<RawAddress>> + Send;
}
