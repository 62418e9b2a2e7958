//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants::api::{CATALOG_URL, NOMINATIM_URL};

/// Default hierarchy API root
pub const DEFAULT_API_BASE_URL: &str = CATALOG_URL;

/// Default hierarchy request timeout in seconds
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default reverse geocoding provider root
pub const DEFAULT_GEOCODER_URL: &str = NOMINATIM_URL;

/// Address detail zoom (18 = building level)
pub const DEFAULT_GEOCODER_ZOOM: u8 = 18;

/// Preferred language for address names
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "";

/// Ask the platform for a high accuracy fix
pub const DEFAULT_HIGH_ACCURACY: bool = true;

/// How long to wait for the device position
pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 10_000;

/// Oldest cached fix that may be reused (0 = always query)
pub const DEFAULT_GEOLOCATION_MAX_AGE_MS: u64 = 0;

/// Quiet period before a settlement search is sent
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Device and manual points closer than this are considered the same place
pub const DEFAULT_DIVERGENCE_TOLERANCE_M: f64 = 25.0;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "listing-locator";
