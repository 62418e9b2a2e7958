//! HTTP client for the hierarchy REST API
//!
//! Every endpoint answers with a `{"data": [...]}` envelope. Non-2xx statuses
//! and envelopes that do not parse surface as [`Error::Catalog`].

use crate::config::ApiConfig;
use crate::constants::api::USER_AGENT;
use crate::error::{Error, Result};
use crate::hierarchy::{Catalog, Community, Country, Region, Settlement};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

/// Client for the hierarchy REST API
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Creates a client from the `[api]` config section
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a client with a custom base URL (for testing with wiremock)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<Vec<T>> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Catalog(format!(
                "{} returned status: {}",
                path_and_query,
                response.status()
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            Error::Catalog(format!("Failed to parse {} response: {}", path_and_query, e))
        })?;

        Ok(envelope.data)
    }
}

impl Catalog for CatalogClient {
    async fn countries(&self) -> Result<Vec<Country>> {
        self.fetch_list("/countries").await
    }

    async fn regions(&self, country_id: i64) -> Result<Vec<Region>> {
        self.fetch_list(&format!("/regions?countryId={}", country_id))
            .await
    }

    async fn communities(&self, region_id: i64) -> Result<Vec<Community>> {
        self.fetch_list(&format!("/communities?regionId={}", region_id))
            .await
    }

    async fn settlements(&self, community_id: i64) -> Result<Vec<Settlement>> {
        self.fetch_list(&format!("/locations?communityId={}", community_id))
            .await
    }

    async fn search_settlements(&self, community_id: i64, query: &str) -> Result<Vec<Settlement>> {
        self.fetch_list(&format!(
            "/locations?communityId={}&search={}",
            community_id,
            urlencoding::encode(query)
        ))
        .await
    }
}
