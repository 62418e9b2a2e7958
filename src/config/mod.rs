//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/listing-locator/config.toml

pub mod defaults;

use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Hierarchy REST API
    #[serde(default)]
    pub api: ApiConfig,

    /// Reverse geocoding provider
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Device position options
    #[serde(default)]
    pub geolocation: GeolocationConfig,

    /// Location form behaviour
    #[serde(default)]
    pub form: FormConfig,
}

/// Hierarchy REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL; `/countries`, `/regions`, ... are appended
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

/// Reverse geocoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_url")]
    pub url: String,

    #[serde(default = "default_geocoder_zoom")]
    pub zoom: u8,

    /// Sent as `accept-language`; empty means provider default
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

/// Device position options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,

    #[serde(default = "default_geolocation_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_geolocation_max_age")]
    pub max_age_ms: u64,
}

/// Location form behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Settlement search debounce in milliseconds
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Distance in meters below which device and manual points agree
    #[serde(default = "default_divergence_tolerance")]
    pub divergence_tolerance_m: f64,

    /// Replace the device point with the geocoded address point
    #[serde(default)]
    pub snap_to_address: bool,
}

// Default value functions for serde
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_api_timeout() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}
fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}
fn default_geocoder_zoom() -> u8 {
    DEFAULT_GEOCODER_ZOOM
}
fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}
fn default_high_accuracy() -> bool {
    DEFAULT_HIGH_ACCURACY
}
fn default_geolocation_timeout() -> u64 {
    DEFAULT_GEOLOCATION_TIMEOUT_MS
}
fn default_geolocation_max_age() -> u64 {
    DEFAULT_GEOLOCATION_MAX_AGE_MS
}
fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_divergence_tolerance() -> f64 {
    DEFAULT_DIVERGENCE_TOLERANCE_M
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
            zoom: default_geocoder_zoom(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: default_high_accuracy(),
            timeout_ms: default_geolocation_timeout(),
            max_age_ms: default_geolocation_max_age(),
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            divergence_tolerance_m: default_divergence_tolerance(),
            snap_to_address: false,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["api", "base_url"] => Some(self.api.base_url.clone()),
            ["api", "timeout_secs"] => Some(self.api.timeout_secs.to_string()),

            ["geocoder", "url"] => Some(self.geocoder.url.clone()),
            ["geocoder", "zoom"] => Some(self.geocoder.zoom.to_string()),
            ["geocoder", "accept_language"] => Some(self.geocoder.accept_language.clone()),

            ["geolocation", "high_accuracy"] => Some(self.geolocation.high_accuracy.to_string()),
            ["geolocation", "timeout_ms"] => Some(self.geolocation.timeout_ms.to_string()),
            ["geolocation", "max_age_ms"] => Some(self.geolocation.max_age_ms.to_string()),

            ["form", "debounce_ms"] => Some(self.form.debounce_ms.to_string()),
            ["form", "divergence_tolerance_m"] => {
                Some(self.form.divergence_tolerance_m.to_string())
            }
            ["form", "snap_to_address"] => Some(self.form.snap_to_address.to_string()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["api", "base_url"] => {
                self.api.base_url = value.to_string();
            }
            ["api", "timeout_secs"] => {
                self.api.timeout_secs = parse_value(key, value)?;
            }

            ["geocoder", "url"] => {
                self.geocoder.url = value.to_string();
            }
            ["geocoder", "zoom"] => {
                let zoom: u8 = parse_value(key, value)?;
                if zoom > 18 {
                    return Err(Error::Config(format!("Zoom must be 0-18, got {}", zoom)));
                }
                self.geocoder.zoom = zoom;
            }
            ["geocoder", "accept_language"] => {
                self.geocoder.accept_language = value.to_string();
            }

            ["geolocation", "high_accuracy"] => {
                self.geolocation.high_accuracy = parse_value(key, value)?;
            }
            ["geolocation", "timeout_ms"] => {
                self.geolocation.timeout_ms = parse_value(key, value)?;
            }
            ["geolocation", "max_age_ms"] => {
                self.geolocation.max_age_ms = parse_value(key, value)?;
            }

            ["form", "debounce_ms"] => {
                self.form.debounce_ms = parse_value(key, value)?;
            }
            ["form", "divergence_tolerance_m"] => {
                let tolerance: f64 = parse_value(key, value)?;
                if !tolerance.is_finite() || tolerance < 0.0 {
                    return Err(Error::Config(format!(
                        "Tolerance must be a non-negative distance, got {}",
                        value
                    )));
                }
                self.form.divergence_tolerance_m = tolerance;
            }
            ["form", "snap_to_address"] => {
                self.form.snap_to_address = parse_value(key, value)?;
            }

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "api.base_url",
            "api.timeout_secs",
            "geocoder.url",
            "geocoder.zoom",
            "geocoder.accept_language",
            "geolocation.high_accuracy",
            "geolocation.timeout_ms",
            "geolocation.max_age_ms",
            "form.debounce_ms",
            "form.divergence_tolerance_m",
            "form.snap_to_address",
        ]
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
