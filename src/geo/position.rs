//! Device position provider
//!
//! Wraps a [`PositionSource`] and enforces the caller's timeout and
//! maximum-age options. The provider never touches form state; the
//! reconciler decides what to do with the result.

use crate::coord::{Coordinates, GeoPoint};
use crate::geo::{GeoError, PositionFix, PositionOptions, PositionSource};
use chrono::Utc;
use std::sync::Mutex;
use tracing::debug;

/// Position provider with timeout and fix caching
#[derive(Debug)]
pub struct GeoPositionProvider<S> {
    source: S,
    last_fix: Mutex<Option<PositionFix>>,
}

impl<S: PositionSource> GeoPositionProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_fix: Mutex::new(None),
        }
    }

    /// Acquire the device position
    ///
    /// Resolves with a device-tagged point or a [`GeoError`]. If the source
    /// does not answer within `options.timeout` the query is abandoned and
    /// `Timeout` is returned; whatever the source produces afterwards is
    /// never observed.
    pub async fn acquire(&self, options: PositionOptions) -> Result<GeoPoint, GeoError> {
        if let Some(fix) = self.cached_fix(options) {
            debug!("Reusing cached position fix from {}", fix.timestamp);
            return Ok(fix.point());
        }

        match tokio::time::timeout(options.timeout, self.source.query(options)).await {
            Ok(Ok(fix)) => {
                if let Ok(mut last) = self.last_fix.lock() {
                    *last = Some(fix);
                }
                Ok(fix.point())
            }
            Ok(Err(e)) => {
                debug!("Position source failed: {}", e);
                Err(e)
            }
            Err(_) => {
                debug!("Position query timed out after {:?}", options.timeout);
                Err(GeoError::Timeout)
            }
        }
    }

    /// Last successful fix if it is young enough for `options.max_age`
    fn cached_fix(&self, options: PositionOptions) -> Option<PositionFix> {
        if options.max_age.is_zero() {
            return None;
        }
        let fix = (*self.last_fix.lock().ok()?)?;
        let age = (Utc::now() - fix.timestamp).to_std().ok()?;
        (age <= options.max_age).then_some(fix)
    }
}

/// A source that always reports the same point
///
/// Used when the caller already knows the device position (e.g. passed on
/// the command line).
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionSource {
    coords: Coordinates,
}

impl FixedPositionSource {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            coords: Coordinates::new(lat, lng),
        }
    }
}

impl PositionSource for FixedPositionSource {
    async fn query(&self, _options: PositionOptions) -> Result<PositionFix, GeoError> {
        Ok(PositionFix::now(self.coords, None))
    }
}

/// A source for sessions where location access is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedPositionSource;

impl PositionSource for DeniedPositionSource {
    async fn query(&self, _options: PositionOptions) -> Result<PositionFix, GeoError> {
        Err(GeoError::PermissionDenied)
    }
}
