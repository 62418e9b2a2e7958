//! listing-locator: location resolution for property listings
//!
//! Turns a device position or a point picked on a map into a complete
//! listing location: country, region, community and settlement from a
//! hierarchy catalog, plus the coordinates the listing will be published
//! with.
//!
//! ## Features
//!
//! - Cascading hierarchy lists with stale-response discarding
//! - Device position with timeout, cached fix and IP fallback
//! - Reverse geocoding (Nominatim) and address-to-hierarchy matching
//! - Device vs. manual coordinate ownership with divergence detection
//! - Debounced settlement search
//!
//! ## Quick Start
//!
//! ```no_run
//! use listing_locator::config::Config;
//! use listing_locator::geo::{FixedPositionSource, ReverseGeocodeClient};
//! use listing_locator::hierarchy::CatalogClient;
//! use listing_locator::session::LocationSession;
//!
//! # async fn demo() -> listing_locator::Result<()> {
//! let config = Config::load()?;
//! let catalog = CatalogClient::new(&config.api)?;
//! let geocoder = ReverseGeocodeClient::new(&config.geocoder)?;
//! let device = FixedPositionSource::new(49.5535, 25.5948);
//!
//! let mut session = LocationSession::new(&config, catalog, geocoder, device);
//! session.open();
//! session.toggle_use_device_location(true);
//! session.settle().await;
//!
//! println!("{:?}", session.selection());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod form;
pub mod geo;
pub mod hierarchy;
pub mod matcher;
pub mod reconcile;
pub mod request;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use coord::{Coordinates, GeoPoint, PointSource};
pub use error::{Error, Result};
pub use form::{LocationForm, LocationSelection, Notice};
pub use session::LocationSession;
