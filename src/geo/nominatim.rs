//! Reverse geocoding client (OpenStreetMap Nominatim)
//!
//! Uses the free Nominatim API. Rate limit: 1 request per second, and a
//! descriptive User-Agent is mandatory.

use crate::config::GeocoderConfig;
use crate::constants::api::USER_AGENT;
use crate::coord::{Coordinates, GeoPoint};
use crate::error::{Error, Result};
use crate::geo::ReverseGeocoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Address fields returned for a point
///
/// Field names follow the provider's `address` object. Most are optional;
/// which ones are present depends on the country and how densely the area
/// is mapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAddress {
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub town: Option<String>,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub hamlet: Option<String>,

    /// Full one-line address
    #[serde(default)]
    pub display_name: Option<String>,

    /// Coordinate of the matched address object, not the query point
    #[serde(default)]
    pub location: Option<Coordinates>,
}

impl RawAddress {
    /// First-level division name (oblast, state, province)
    pub fn region_name(&self) -> Option<&str> {
        self.state.as_deref().or(self.region.as_deref())
    }

    /// Second-level division name, used to guess the community
    pub fn community_name(&self) -> Option<&str> {
        self.municipality
            .as_deref()
            .or(self.district.as_deref())
            .or(self.county.as_deref())
    }

    /// Most specific populated place name
    pub fn settlement_name(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.hamlet.as_deref())
    }
}

/// Nominatim `/reverse` response
#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    lat: Option<String>,
    #[serde(default)]
    lon: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<RawAddress>,
    /// Set instead of an address when nothing is there (open sea, etc.)
    #[serde(default)]
    error: Option<String>,
}

/// Reverse geocoding client
#[derive(Debug, Clone)]
pub struct ReverseGeocodeClient {
    client: reqwest::Client,
    base_url: String,
    zoom: u8,
    accept_language: Option<String>,
}

impl ReverseGeocodeClient {
    /// Create a client from the geocoder config section
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        let accept_language = Some(config.accept_language.clone()).filter(|l| !l.is_empty());

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            zoom: config.zoom,
            accept_language,
        })
    }

    /// Create a client with a custom base URL (for testing with wiremock)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let config = GeocoderConfig {
            url: base_url.to_string(),
            ..GeocoderConfig::default()
        };
        Self::new(&config)
    }

    fn parse_coords(lat: &str, lng: &str) -> Result<Coordinates> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Geocoding(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::Geocoding(format!("Invalid longitude: {}", lng)))?;
        Ok(Coordinates::new(lat, lng))
    }

    /// Single attempt, errors propagated
    pub async fn try_lookup(&self, point: GeoPoint) -> Result<Option<RawAddress>> {
        let mut url = format!(
            "{}/reverse?lat={}&lon={}&zoom={}&addressdetails=1&format=jsonv2",
            self.base_url,
            point.lat(),
            point.lng(),
            self.zoom
        );
        if let Some(lang) = &self.accept_language {
            url.push_str(&format!("&accept-language={}", urlencoding::encode(lang)));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Geocoding(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            return Err(Error::Geocoding(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let result: NominatimReverse = response
            .json()
            .await
            .map_err(|e| Error::Geocoding(format!("Failed to parse Nominatim response: {}", e)))?;

        if let Some(reason) = result.error {
            debug!("Nominatim found nothing at {:?}: {}", point.coords, reason);
            return Ok(None);
        }

        let Some(mut address) = result.address else {
            return Ok(None);
        };

        address.display_name = result.display_name;
        if let (Some(lat), Some(lon)) = (&result.lat, &result.lon) {
            address.location = Some(Self::parse_coords(lat, lon)?);
        }

        Ok(Some(address))
    }
}

impl ReverseGeocoder for ReverseGeocodeClient {
    async fn lookup(&self, point: GeoPoint) -> Option<RawAddress> {
        match self.try_lookup(point).await {
            Ok(address) => address,
            Err(e) => {
                debug!("Reverse geocoding skipped: {}", e);
                None
            }
        }
    }
}
