//! Error types for listing-locator

use crate::geo::GeoError;
use crate::hierarchy::Level;
use thiserror::Error;

/// Main error type for listing-locator operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("No {level} with id {id} in the loaded list")]
    UnknownSelection { level: Level, id: i64 },

    #[error("Position error: {0}")]
    Position(#[from] GeoError),
}

/// Result type alias for listing-locator operations
pub type Result<T> = std::result::Result<T, Error>;
