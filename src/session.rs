//! Event loop around a [`LocationForm`]
//!
//! User actions are plain methods: they update the form at once and spawn
//! whatever network work it asks for. Completed work comes back through
//! [`LocationSession::next_event`], one completion at a time, so the form
//! is only ever touched by one logical thread. Superseded work still runs
//! to completion; the form drops its result.

use crate::config::Config;
use crate::coord::{Coordinates, GeoPoint};
use crate::error::Result;
use crate::form::{Effect, LocationForm, LocationSelection, Notice};
use crate::geo::{
    GeoError, GeoPositionProvider, PositionOptions, PositionSource, RawAddress, ReverseGeocoder,
};
use crate::hierarchy::{Catalog, FetchPayload, FetchTicket, Level};
use crate::request::{DebounceTimer, Generation};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// A finished piece of network work
#[derive(Debug)]
enum Completion {
    Fetched(FetchTicket, Result<FetchPayload>),
    Position(std::result::Result<GeoPoint, GeoError>),
    Address {
        origin: GeoPoint,
        generation: Generation,
        address: Option<RawAddress>,
    },
    Debounced(DebounceTimer<Level>),
}

pub struct LocationSession<C, G, S> {
    form: LocationForm,
    catalog: Arc<C>,
    geocoder: Arc<G>,
    position: Arc<GeoPositionProvider<S>>,
    options: PositionOptions,
    inflight: JoinSet<Completion>,
}

impl<C, G, S> LocationSession<C, G, S>
where
    C: Catalog + 'static,
    G: ReverseGeocoder + 'static,
    S: PositionSource + 'static,
{
    pub fn new(config: &Config, catalog: C, geocoder: G, source: S) -> Self {
        Self {
            form: LocationForm::new(&config.form),
            catalog: Arc::new(catalog),
            geocoder: Arc::new(geocoder),
            position: Arc::new(GeoPositionProvider::new(source)),
            options: PositionOptions::from(&config.geolocation),
            inflight: JoinSet::new(),
        }
    }

    pub fn form(&self) -> &LocationForm {
        &self.form
    }

    pub fn selection(&self) -> LocationSelection {
        self.form.selection()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.form.notices()
    }

    pub fn is_resolved(&self) -> bool {
        self.form.is_resolved()
    }

    /// Number of spawned tasks not yet handled
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn open(&mut self) {
        let effects = self.form.open();
        self.run(effects);
    }

    pub fn select_country(&mut self, country_id: Option<i64>) -> Result<()> {
        let effects = self.form.select_country(country_id)?;
        self.run(effects);
        Ok(())
    }

    pub fn select_region(&mut self, region_id: Option<i64>) -> Result<()> {
        let effects = self.form.select_region(region_id)?;
        self.run(effects);
        Ok(())
    }

    pub fn select_community(&mut self, community_id: Option<i64>) -> Result<()> {
        let effects = self.form.select_community(community_id)?;
        self.run(effects);
        Ok(())
    }

    pub fn set_settlement_name(&mut self, name: &str) {
        self.form.set_settlement_name(name);
    }

    pub fn search_settlements(&mut self, text: &str) {
        let effects = self.form.search_settlements(text);
        self.run(effects);
    }

    pub fn retry(&mut self, level: Level) {
        let effects = self.form.retry(level);
        self.run(effects);
    }

    pub fn toggle_use_device_location(&mut self, on: bool) {
        let effects = self.form.toggle_use_device_location(on);
        self.run(effects);
    }

    pub fn map_point_chosen(&mut self, coords: Coordinates) -> Result<()> {
        self.form.map_point_chosen(coords)
    }

    pub fn dismiss_location_error(&mut self) {
        self.form.dismiss_location_error();
    }

    /// Wait for the next completion and hand it to the form
    ///
    /// Returns `false` when nothing is in flight.
    pub async fn next_event(&mut self) -> bool {
        let Some(joined) = self.inflight.join_next().await else {
            return false;
        };

        let completion = match joined {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Background task failed: {}", e);
                return true;
            }
        };

        let effects = match completion {
            Completion::Fetched(ticket, result) => self.form.fetch_completed(&ticket, result),
            Completion::Position(result) => self.form.position_resolved(result),
            Completion::Address {
                origin,
                generation,
                address,
            } => self.form.address_resolved(origin, generation, address),
            Completion::Debounced(timer) => self.form.debounce_elapsed(timer),
        };
        self.run(effects);
        true
    }

    /// Handle completions until nothing is in flight
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch(ticket) => {
                    let catalog = Arc::clone(&self.catalog);
                    self.inflight.spawn(async move {
                        let result = ticket.request.run(catalog.as_ref()).await;
                        Completion::Fetched(ticket, result)
                    });
                }
                Effect::AcquirePosition => {
                    let position = Arc::clone(&self.position);
                    let options = self.options;
                    self.inflight
                        .spawn(async move { Completion::Position(position.acquire(options).await) });
                }
                Effect::ReverseGeocode { point, generation } => {
                    let geocoder = Arc::clone(&self.geocoder);
                    self.inflight.spawn(async move {
                        let address = geocoder.lookup(point).await;
                        Completion::Address {
                            origin: point,
                            generation,
                            address,
                        }
                    });
                }
                Effect::Debounce(timer) => {
                    self.inflight
                        .spawn(async move { Completion::Debounced(timer.elapsed().await) });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Error;
    use crate::geo::{DeniedPositionSource, FixedPositionSource};
    use crate::hierarchy::{Community, Country, Region, Settlement};
    use crate::reconcile::CoordinateState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory catalog with per-country delays
    #[derive(Default)]
    struct FakeCatalog {
        region_delay_ms: Vec<(i64, u64)>,
        fail_regions: bool,
        searches: Mutex<Vec<String>>,
        region_calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn delay_for(&self, country_id: i64) -> Duration {
            let ms = self
                .region_delay_ms
                .iter()
                .find(|(id, _)| *id == country_id)
                .map(|(_, ms)| *ms)
                .unwrap_or(10);
            Duration::from_millis(ms)
        }
    }

    impl Catalog for FakeCatalog {
        async fn countries(&self) -> Result<Vec<Country>> {
            Ok(vec![
                Country {
                    id: 1,
                    name: "Україна".to_string(),
                    iso_code: "UA".to_string(),
                    latitude: None,
                    longitude: None,
                },
                Country {
                    id: 2,
                    name: "Polska".to_string(),
                    iso_code: "PL".to_string(),
                    latitude: None,
                    longitude: None,
                },
            ])
        }

        async fn regions(&self, country_id: i64) -> Result<Vec<Region>> {
            self.region_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay_for(country_id)).await;
            if self.fail_regions {
                return Err(Error::Catalog("regions unavailable".to_string()));
            }
            Ok(match country_id {
                1 => vec![Region { id: 10, name: "Ternopilska".to_string(), country_id: 1 }],
                _ => vec![Region { id: 20, name: "Mazowieckie".to_string(), country_id: 2 }],
            })
        }

        async fn communities(&self, region_id: i64) -> Result<Vec<Community>> {
            Ok(vec![Community {
                id: region_id * 10,
                name: "Ternopilska miska hromada".to_string(),
                region_id,
            }])
        }

        async fn settlements(&self, community_id: i64) -> Result<Vec<Settlement>> {
            Ok(vec![Settlement {
                id: community_id * 10,
                name: "Тернопіль".to_string(),
                community_id,
            }])
        }

        async fn search_settlements(&self, community_id: i64, query: &str) -> Result<Vec<Settlement>> {
            if let Ok(mut searches) = self.searches.lock() {
                searches.push(query.to_string());
            }
            Ok(vec![Settlement {
                id: 1,
                name: format!("{} (match)", query),
                community_id,
            }])
        }
    }

    /// Geocoder that always answers with the same address (or nothing)
    struct FakeGeocoder(Option<RawAddress>);

    impl ReverseGeocoder for FakeGeocoder {
        async fn lookup(&self, _point: GeoPoint) -> Option<RawAddress> {
            self.0.clone()
        }
    }

    fn ternopil() -> Option<RawAddress> {
        Some(RawAddress {
            country_code: Some("ua".to_string()),
            state: Some("Ternopil Oblast".to_string()),
            municipality: Some("Ternopilska".to_string()),
            city: Some("Ternopil".to_string()),
            ..RawAddress::default()
        })
    }

    async fn opened<S: PositionSource + 'static>(
        catalog: FakeCatalog,
        geocoder: FakeGeocoder,
        source: S,
    ) -> LocationSession<FakeCatalog, FakeGeocoder, S> {
        let mut session = LocationSession::new(&Config::default(), catalog, geocoder, source);
        session.open();
        session.settle().await;
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_stale_region_response_is_ignored() {
        let catalog = FakeCatalog {
            region_delay_ms: vec![(1, 500), (2, 50)],
            ..FakeCatalog::default()
        };
        let mut session = opened(catalog, FakeGeocoder(None), DeniedPositionSource).await;

        session.select_country(Some(1)).unwrap();
        session.select_country(Some(2)).unwrap();
        assert!(session.form().store().regions().items.is_empty());
        assert_eq!(session.in_flight(), 2);

        session.settle().await;

        let regions = &session.form().store().regions().items;
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].country_id, 2);
        assert_eq!(session.selection().country_id, Some(2));
        assert_eq!(session.catalog.region_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_location_autofills() {
        let mut session = opened(
            FakeCatalog::default(),
            FakeGeocoder(ternopil()),
            FixedPositionSource::new(49.8397, 25.9332),
        )
        .await;

        session.toggle_use_device_location(true);
        session.settle().await;

        let selection = session.selection();
        assert!(selection.use_device_location);
        assert_eq!(selection.coordinates, Some(GeoPoint::device(49.8397, 25.9332)));
        assert_eq!(selection.country_id, Some(1));
        assert_eq!(selection.region_id, Some(10));
        assert_eq!(selection.community_id, Some(100));
        assert_eq!(selection.settlement_name.as_deref(), Some("Ternopil"));
        assert!(session.is_resolved());
        assert!(session.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_location_falls_back_to_map() {
        let mut session =
            opened(FakeCatalog::default(), FakeGeocoder(ternopil()), DeniedPositionSource).await;

        session.toggle_use_device_location(true);
        session.settle().await;

        assert!(!session.selection().use_device_location);
        assert_eq!(session.selection().coordinates, None);
        assert_eq!(
            session.notices(),
            vec![Notice::LocationUnavailable { error: GeoError::PermissionDenied }]
        );

        session.map_point_chosen(Coordinates::new(49.84, 25.93)).unwrap();
        assert_eq!(session.selection().coordinates, Some(GeoPoint::manual(49.84, 25.93)));
        assert_eq!(session.form().coordinate_state(), CoordinateState::UsingManual);

        session.dismiss_location_error();
        assert!(session.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_round_trip_without_map_click() {
        let mut session = opened(
            FakeCatalog::default(),
            FakeGeocoder(None),
            FixedPositionSource::new(49.8397, 25.9332),
        )
        .await;

        session.toggle_use_device_location(true);
        session.settle().await;
        let device = session.selection().coordinates;

        session.toggle_use_device_location(false);
        session.toggle_use_device_location(true);
        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.selection().coordinates, device);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_pick_during_acquisition_wins() {
        let mut session = opened(
            FakeCatalog::default(),
            FakeGeocoder(ternopil()),
            FixedPositionSource::new(49.8397, 25.9332),
        )
        .await;

        session.toggle_use_device_location(true);
        session.map_point_chosen(Coordinates::new(49.90, 26.00)).unwrap();
        session.settle().await;

        let selection = session.selection();
        assert!(!selection.use_device_location);
        assert_eq!(selection.coordinates, Some(GeoPoint::manual(49.90, 26.00)));
        // Fix cached, no auto-fill for a point the user overrode
        assert!(session.form().coordinates().device_point().is_some());
        assert_eq!(selection.country_id, None);
        assert!(matches!(session.notices().as_slice(), [Notice::Diverged { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_region_failure_then_retry() {
        let catalog = FakeCatalog {
            fail_regions: true,
            ..FakeCatalog::default()
        };
        let mut session = opened(catalog, FakeGeocoder(None), DeniedPositionSource).await;

        session.select_country(Some(1)).unwrap();
        session.settle().await;
        assert!(matches!(
            session.notices().as_slice(),
            [Notice::HierarchyFetchFailed { level: Level::Regions, .. }]
        ));
        assert_eq!(session.selection().country_id, Some(1));

        session.retry(Level::Regions);
        session.settle().await;
        assert_eq!(session.catalog.region_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_search_debounced() {
        let mut session = opened(FakeCatalog::default(), FakeGeocoder(None), DeniedPositionSource).await;
        session.select_country(Some(1)).unwrap();
        session.settle().await;
        session.select_region(Some(10)).unwrap();
        session.settle().await;
        session.select_community(Some(100)).unwrap();
        session.settle().await;

        session.search_settlements("Т");
        session.search_settlements("Те");
        session.search_settlements("Тер");
        session.settle().await;

        let searches = session.catalog.searches.lock().unwrap().clone();
        assert_eq!(searches, vec!["Тер".to_string()]);
        let suggestions = &session.form().store().suggestions().items;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "Тер (match)");
    }
}
