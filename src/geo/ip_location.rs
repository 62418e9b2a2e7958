//! IP-based position source
//!
//! Uses ip-api.com to approximate the device position from its public IP.
//! Coarse (city level at best) but needs no platform permission, which makes
//! it the default source for headless runs.

use crate::constants::api::{IP_API_URL, USER_AGENT};
use crate::coord::Coordinates;
use crate::error::Result;
use crate::geo::{GeoError, PositionFix, PositionOptions, PositionSource};
use serde::Deserialize;
use tracing::debug;

/// Typical uncertainty of an IP lookup in meters
const IP_ACCURACY_METERS: f64 = 5_000.0;

/// IP position source
#[derive(Debug, Clone)]
pub struct IpPositionSource {
    client: reqwest::Client,
    url: String,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl IpPositionSource {
    /// Create a source pointed at ip-api.com
    pub fn new() -> Result<Self> {
        Self::with_url(IP_API_URL)
    }

    /// Create a source pointed at a different endpoint (for tests)
    pub fn with_url(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Fetch location from ip-api.com
    async fn fetch_location(&self) -> std::result::Result<Coordinates, String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| format!("IP location request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "IP location API returned status: {}",
                response.status()
            ));
        }

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse IP location response: {}", e))?;

        if data.status != "success" {
            return Err(format!(
                "IP location lookup failed: {}",
                data.message.unwrap_or_else(|| "unknown reason".to_string())
            ));
        }

        match (data.lat, data.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err("No coordinates in IP location response".to_string()),
        }
    }
}

impl PositionSource for IpPositionSource {
    async fn query(&self, options: PositionOptions) -> std::result::Result<PositionFix, GeoError> {
        if options.high_accuracy {
            debug!("High accuracy requested; IP lookup is city-level only");
        }

        match self.fetch_location().await {
            Ok(coords) => Ok(PositionFix::now(coords, Some(IP_ACCURACY_METERS))),
            Err(reason) => {
                debug!("{}", reason);
                Err(GeoError::PositionUnavailable)
            }
        }
    }
}
