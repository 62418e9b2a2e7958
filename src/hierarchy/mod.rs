//! Administrative hierarchy: country → region → community → settlement
//!
//! Reference data comes from a [`Catalog`]; [`store::HierarchyStore`] holds
//! what has been loaded for the current selection and enforces parent → child
//! invalidation.

pub mod client;
pub mod store;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use client::CatalogClient;
pub use store::{ApplyOutcome, FetchState, FetchStatus, FetchTicket, HierarchyStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub iso_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub country_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub region_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: i64,
    pub name: String,
    pub community_id: i64,
}

/// Anything with a display name the matcher can compare against
pub trait Named {
    fn id(&self) -> i64;

    fn name(&self) -> &str;
}

macro_rules! impl_named {
    ($($ty:ty),*) => {
        $(impl Named for $ty {
            fn id(&self) -> i64 {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        })*
    };
}

impl_named!(Country, Region, Community, Settlement);

/// One list the store loads, also used as the request coordinator key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Countries,
    Regions,
    Communities,
    Settlements,
    /// Free-text settlement suggestions within the selected community
    SettlementSearch,
}

impl Level {
    /// Levels whose contents depend on this level's selection
    pub fn children(self) -> &'static [Level] {
        match self {
            Self::Countries => &[
                Self::Regions,
                Self::Communities,
                Self::Settlements,
                Self::SettlementSearch,
            ],
            Self::Regions => &[Self::Communities, Self::Settlements, Self::SettlementSearch],
            Self::Communities => &[Self::Settlements, Self::SettlementSearch],
            Self::Settlements | Self::SettlementSearch => &[],
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Countries => write!(f, "country"),
            Self::Regions => write!(f, "region"),
            Self::Communities => write!(f, "community"),
            Self::Settlements => write!(f, "settlement"),
            Self::SettlementSearch => write!(f, "settlement suggestion"),
        }
    }
}

/// Source of hierarchy reference data
///
/// Implementations must be thread-safe (Send + Sync) so fetches can run on
/// spawned tasks.
pub trait Catalog: Send + Sync {
    fn countries(&self) -> impl Future<Output = Result<Vec<Country>>> + Send;

    fn regions(&self, country_id: i64) -> impl Future<Output = Result<Vec<Region>>> + Send;

    fn communities(&self, region_id: i64) -> impl Future<Output = Result<Vec<Community>>> + Send;

    fn settlements(
        &self,
        community_id: i64,
    ) -> impl Future<Output = Result<Vec<Settlement>>> + Send;

    /// Settlements in a community whose name matches free text
    fn search_settlements(
        &self,
        community_id: i64,
        query: &str,
    ) -> impl Future<Output = Result<Vec<Settlement>>> + Send;
}

/// What a fetch asks the catalog for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Countries,
    Regions { country_id: i64 },
    Communities { region_id: i64 },
    Settlements { community_id: i64 },
    SettlementSearch { community_id: i64, query: String },
}

impl FetchRequest {
    pub fn level(&self) -> Level {
        match self {
            Self::Countries => Level::Countries,
            Self::Regions { .. } => Level::Regions,
            Self::Communities { .. } => Level::Communities,
            Self::Settlements { .. } => Level::Settlements,
            Self::SettlementSearch { .. } => Level::SettlementSearch,
        }
    }

    /// Run the request against a catalog
    pub async fn run<C: Catalog>(&self, catalog: &C) -> Result<FetchPayload> {
        Ok(match self {
            Self::Countries => FetchPayload::Countries(catalog.countries().await?),
            Self::Regions { country_id } => {
                FetchPayload::Regions(catalog.regions(*country_id).await?)
            }
            Self::Communities { region_id } => {
                FetchPayload::Communities(catalog.communities(*region_id).await?)
            }
            Self::Settlements { community_id } => {
                FetchPayload::Settlements(catalog.settlements(*community_id).await?)
            }
            Self::SettlementSearch {
                community_id,
                query,
            } => FetchPayload::Settlements(
                catalog.search_settlements(*community_id, query).await?,
            ),
        })
    }
}

/// Items returned by a fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Countries(Vec<Country>),
    Regions(Vec<Region>),
    Communities(Vec<Community>),
    Settlements(Vec<Settlement>),
}
