//! Resolve command handler
//!
//! Runs one location form end to end: load countries, take the device
//! position (given or IP based), auto-fill the hierarchy from its address
//! and apply an optional manual map point. Prints the selection as JSON;
//! notices also go to stderr.

use crate::config::Config;
use crate::coord::Coordinates;
use crate::error::{Error, Result};
use crate::form::Notice;
use crate::geo::ip_location::IpPositionSource;
use crate::geo::{DeniedPositionSource, FixedPositionSource, PositionSource, ReverseGeocodeClient};
use crate::hierarchy::CatalogClient;
use crate::session::LocationSession;
use clap::Args;

/// Resolve command arguments
#[derive(Args)]
pub struct ResolveArgs {
    /// Device latitude
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Device longitude
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Use current location (IP geolocation)
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub here: bool,

    /// Latitude picked on the map
    #[arg(long, requires = "manual_lng", allow_hyphen_values = true)]
    pub manual_lat: Option<f64>,

    /// Longitude picked on the map
    #[arg(long, requires = "manual_lat", allow_hyphen_values = true)]
    pub manual_lng: Option<f64>,
}

/// Run the resolve command
pub async fn run(args: ResolveArgs) -> Result<()> {
    let config = Config::load()?;

    let manual = match (args.manual_lat, args.manual_lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    };

    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        let device = Coordinates::new(lat, lng);
        device.validate()?;
        resolve(&config, FixedPositionSource::new(lat, lng), true, manual).await
    } else if args.here {
        resolve(&config, IpPositionSource::new()?, true, manual).await
    } else if manual.is_some() {
        resolve(&config, DeniedPositionSource, false, manual).await
    } else {
        Err(Error::InvalidCoordinates(
            "Give --lat/--lng, --here or --manual-lat/--manual-lng".to_string(),
        ))
    }
}

async fn resolve<S: PositionSource + 'static>(
    config: &Config,
    source: S,
    use_device: bool,
    manual: Option<Coordinates>,
) -> Result<()> {
    let catalog = CatalogClient::new(&config.api)?;
    let geocoder = ReverseGeocodeClient::new(&config.geocoder)?;
    let mut session = LocationSession::new(config, catalog, geocoder, source);

    session.open();
    session.settle().await;

    if use_device {
        session.toggle_use_device_location(true);
        session.settle().await;

        // Nothing to fall back on without a map point
        if let (None, Some(error)) = (manual, session.form().coordinates().location_error()) {
            return Err(error.into());
        }
    }
    if let Some(coords) = manual {
        session.map_point_chosen(coords)?;
    }

    let notices = session.notices();
    for notice in &notices {
        match notice {
            Notice::LocationUnavailable { error } => {
                eprintln!("Warning: device location unavailable: {}", error)
            }
            Notice::HierarchyFetchFailed { level, message } => {
                eprintln!("Warning: could not load {} list: {}", level, message)
            }
            Notice::Diverged { distance_m } => eprintln!(
                "Note: map point is {:.0} m from the device location",
                distance_m
            ),
            Notice::CountryMismatch {
                address_country_id,
                selected_country_id,
            } => eprintln!(
                "Note: selected country {} differs from country {} at the device location",
                selected_country_id, address_country_id
            ),
        }
    }

    let selection = session.selection();
    let output = serde_json::json!({
        "resolved": selection.is_resolved(),
        "selection": selection,
        "names": {
            "country": session.form().store().country().map(|c| &c.name),
            "region": session.form().store().region().map(|r| &r.name),
            "community": session.form().store().community().map(|c| &c.name),
        },
        "notices": notices,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
