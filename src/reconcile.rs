//! Coordinate ownership between the device and the map
//!
//! Two sources can supply the listing's coordinates: the device position
//! and a point the user picks on the map. Exactly one of them drives
//! `coordinates` at any moment:
//!
//! - device mode (`use_device_location`): coordinates mirror the last device
//!   fix (or its geocoded address point) and cannot be edited directly
//! - manual mode: coordinates are the last map pick, or unset
//!
//! A map pick always switches to manual mode. The device point is kept when
//! leaving device mode so toggling back restores it without a new query.

use crate::coord::point::haversine_distance;
use crate::coord::{Coordinates, GeoPoint, PointSource};
use crate::geo::GeoError;
use serde::Serialize;
use tracing::debug;

/// Who currently owns the coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateState {
    Unset,
    UsingDevice,
    UsingManual,
    /// Manual mode, and the device point is known and somewhere else
    Diverged,
}

/// Device and manual points disagree (informational only)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Divergence {
    pub device: GeoPoint,
    pub manual: GeoPoint,
    pub distance_m: f64,
}

/// What the caller has to do after toggling device mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A known device point was adopted immediately
    Adopted,
    /// No device point yet; acquire one and report back
    AcquireNeeded,
    /// Device mode is off
    Released,
}

#[derive(Debug, Clone)]
pub struct CoordinateReconciler {
    use_device_location: bool,
    /// Device mode requested, waiting for the first fix
    awaiting_device: bool,
    device_point: Option<GeoPoint>,
    manual_point: Option<GeoPoint>,
    coordinates: Option<GeoPoint>,
    location_error: Option<GeoError>,
    tolerance_m: f64,
}

impl CoordinateReconciler {
    /// `tolerance_m`: points closer than this are not reported as diverged
    pub fn new(tolerance_m: f64) -> Self {
        Self {
            use_device_location: false,
            awaiting_device: false,
            device_point: None,
            manual_point: None,
            coordinates: None,
            location_error: None,
            tolerance_m,
        }
    }

    pub fn coordinates(&self) -> Option<GeoPoint> {
        self.coordinates
    }

    pub fn use_device_location(&self) -> bool {
        self.use_device_location
    }

    pub fn is_awaiting_device(&self) -> bool {
        self.awaiting_device
    }

    pub fn device_point(&self) -> Option<GeoPoint> {
        self.device_point
    }

    pub fn manual_point(&self) -> Option<GeoPoint> {
        self.manual_point
    }

    /// Why the last device request failed, until dismissed or retried
    pub fn location_error(&self) -> Option<GeoError> {
        self.location_error
    }

    pub fn dismiss_location_error(&mut self) {
        self.location_error = None;
    }

    pub fn state(&self) -> CoordinateState {
        if self.coordinates.is_none() {
            CoordinateState::Unset
        } else if self.use_device_location {
            CoordinateState::UsingDevice
        } else if self.divergence().is_some() {
            CoordinateState::Diverged
        } else {
            CoordinateState::UsingManual
        }
    }

    /// Switch device mode on or off
    pub fn toggle_use_device_location(&mut self, on: bool) -> ToggleOutcome {
        if !on {
            self.use_device_location = false;
            self.awaiting_device = false;
            self.coordinates = self.manual_point;
            debug!("Device location off; coordinates now {:?}", self.coordinates);
            return ToggleOutcome::Released;
        }

        self.location_error = None;
        match self.device_point {
            Some(point) => {
                self.use_device_location = true;
                self.awaiting_device = false;
                self.coordinates = Some(point);
                ToggleOutcome::Adopted
            }
            None => {
                self.awaiting_device = true;
                ToggleOutcome::AcquireNeeded
            }
        }
    }

    /// The user picked a point on the map
    pub fn map_point_chosen(&mut self, coords: Coordinates) -> GeoPoint {
        let point = GeoPoint::new(coords, PointSource::Manual);
        self.manual_point = Some(point);
        self.coordinates = Some(point);
        self.use_device_location = false;
        self.awaiting_device = false;
        point
    }

    /// A device fix arrived
    ///
    /// Always cached. Drives `coordinates` only if device mode is on or was
    /// requested and not abandoned since. Returns whether coordinates changed.
    pub fn device_location_resolved(&mut self, coords: Coordinates) -> bool {
        let point = GeoPoint::new(coords, PointSource::Device);
        self.device_point = Some(point);

        if self.use_device_location || self.awaiting_device {
            self.use_device_location = true;
            self.awaiting_device = false;
            self.location_error = None;
            self.coordinates = Some(point);
            true
        } else {
            debug!("Device fix cached; manual mode keeps its coordinates");
            false
        }
    }

    /// A device request failed
    ///
    /// Recorded for the user only if they are still waiting on it. The
    /// current mode and coordinates are left as they were. Returns whether
    /// the failure was recorded.
    pub fn device_location_failed(&mut self, error: GeoError) -> bool {
        if !(self.awaiting_device || self.use_device_location) {
            return false;
        }
        self.awaiting_device = false;
        self.location_error = Some(error);
        true
    }

    /// Replace the device point with the address point it geocoded to
    ///
    /// Only while still in device mode on that same device point.
    pub fn snap_to_address(&mut self, origin: GeoPoint, address: Coordinates) -> bool {
        if !self.use_device_location || self.coordinates != Some(origin) {
            return false;
        }
        self.coordinates = Some(GeoPoint::new(address, PointSource::Geocoded));
        true
    }

    /// Device and manual points both known, in manual mode, and apart
    pub fn divergence(&self) -> Option<Divergence> {
        if self.use_device_location {
            return None;
        }
        let device = self.device_point?;
        let manual = self.manual_point?;
        let distance_m = haversine_distance(device.coords, manual.coords);
        (distance_m > self.tolerance_m).then_some(Divergence {
            device,
            manual,
            distance_m,
        })
    }
}
