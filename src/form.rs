//! The location form: hierarchy selection plus coordinates
//!
//! [`LocationForm`] is a synchronous state machine. User actions and
//! completed network work go in; [`Effect`]s describing the next network
//! work come out. It never performs I/O itself, so every interleaving of
//! user input and network completions can be driven step by step.

use crate::config::FormConfig;
use crate::coord::{Coordinates, GeoPoint};
use crate::error::Result;
use crate::geo::{GeoError, RawAddress};
use crate::hierarchy::{
    ApplyOutcome, FetchPayload, FetchStatus, FetchTicket, HierarchyStore, Level,
};
use crate::matcher::{match_address, match_community, match_region, AddressMatch};
use crate::reconcile::{CoordinateReconciler, CoordinateState, ToggleOutcome};
use crate::request::{DebounceTimer, Debouncer, Generation, RequestCoordinator};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Snapshot handed to the listing submission flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSelection {
    pub country_id: Option<i64>,
    pub region_id: Option<i64>,
    pub community_id: Option<i64>,
    pub settlement_name: Option<String>,
    pub coordinates: Option<GeoPoint>,
    pub use_device_location: bool,
}

impl LocationSelection {
    /// Country, region and coordinates are all set
    pub fn is_resolved(&self) -> bool {
        self.country_id.is_some() && self.region_id.is_some() && self.coordinates.is_some()
    }
}

/// Non-blocking signal for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Device location could not be determined; retry by toggling again
    LocationUnavailable { error: GeoError },
    /// A dropdown could not be filled; retry that level
    HierarchyFetchFailed { level: Level, message: String },
    /// Manual pick is far from where the device is
    Diverged { distance_m: f64 },
    /// Country picked by hand differs from the one at the device location
    CountryMismatch {
        address_country_id: i64,
        selected_country_id: i64,
    },
}

/// Network work the form wants done
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch(FetchTicket),
    AcquirePosition,
    ReverseGeocode { point: GeoPoint, generation: Generation },
    Debounce(DebounceTimer<Level>),
}

/// Names still to be applied as child levels finish loading
#[derive(Debug, Clone, Default)]
struct Autofill {
    region_name: Option<String>,
    community_name: Option<String>,
    settlement_name: Option<String>,
}

#[derive(Debug)]
pub struct LocationForm {
    id: Uuid,
    store: HierarchyStore,
    coords: CoordinateReconciler,
    autofill: Option<Autofill>,
    /// Address that arrived before the country list, with the point it
    /// was looked up for
    pending_address: Option<(GeoPoint, RawAddress)>,
    /// Country the device address matched
    address_country: Option<i64>,
    lookups: RequestCoordinator<()>,
    search: Debouncer<Level>,
    search_text: String,
    snap_to_address: bool,
}

impl LocationForm {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: HierarchyStore::new(),
            coords: CoordinateReconciler::new(config.divergence_tolerance_m),
            autofill: None,
            pending_address: None,
            address_country: None,
            lookups: RequestCoordinator::new(),
            search: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            search_text: String::new(),
            snap_to_address: config.snap_to_address,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &HierarchyStore {
        &self.store
    }

    pub fn coordinates(&self) -> &CoordinateReconciler {
        &self.coords
    }

    pub fn coordinate_state(&self) -> CoordinateState {
        self.coords.state()
    }

    pub fn selection(&self) -> LocationSelection {
        LocationSelection {
            country_id: self.store.country_id(),
            region_id: self.store.region_id(),
            community_id: self.store.community_id(),
            settlement_name: self.store.settlement_name().map(str::to_string),
            coordinates: self.coords.coordinates(),
            use_device_location: self.coords.use_device_location(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.selection().is_resolved()
    }

    /// Everything worth showing the user right now
    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = Vec::new();

        if let Some(error) = self.coords.location_error() {
            notices.push(Notice::LocationUnavailable { error });
        }

        let store = &self.store;
        let levels = [
            (Level::Countries, store.countries().status, &store.countries().error),
            (Level::Regions, store.regions().status, &store.regions().error),
            (Level::Communities, store.communities().status, &store.communities().error),
            (Level::Settlements, store.settlements().status, &store.settlements().error),
        ];
        for (level, status, error) in levels {
            if status == FetchStatus::Failed {
                notices.push(Notice::HierarchyFetchFailed {
                    level,
                    message: error.clone().unwrap_or_default(),
                });
            }
        }

        if let (true, Some(address), Some(selected)) = (
            self.coords.use_device_location(),
            self.address_country,
            store.country_id(),
        ) {
            if address != selected {
                notices.push(Notice::CountryMismatch {
                    address_country_id: address,
                    selected_country_id: selected,
                });
            }
        }

        if let Some(divergence) = self.coords.divergence() {
            notices.push(Notice::Diverged {
                distance_m: divergence.distance_m,
            });
        }

        notices
    }

    pub fn dismiss_location_error(&mut self) {
        self.coords.dismiss_location_error();
    }

    /// Form mounted: load the countries
    pub fn open(&mut self) -> Vec<Effect> {
        info!(form = %self.id, "Location form opened");
        vec![Effect::Fetch(self.store.load_countries())]
    }

    pub fn select_country(&mut self, country_id: Option<i64>) -> Result<Vec<Effect>> {
        self.cancel_autofill();
        self.cancel_search();
        Ok(self.store.select_country(country_id)?.map(Effect::Fetch).into_iter().collect())
    }

    pub fn select_region(&mut self, region_id: Option<i64>) -> Result<Vec<Effect>> {
        self.cancel_autofill();
        self.cancel_search();
        Ok(self.store.select_region(region_id)?.map(Effect::Fetch).into_iter().collect())
    }

    pub fn select_community(&mut self, community_id: Option<i64>) -> Result<Vec<Effect>> {
        self.cancel_autofill();
        self.cancel_search();
        Ok(self
            .store
            .select_community(community_id)?
            .map(Effect::Fetch)
            .into_iter()
            .collect())
    }

    pub fn set_settlement_name(&mut self, name: &str) {
        if let Some(autofill) = &mut self.autofill {
            autofill.settlement_name = None;
        }
        self.store.set_settlement_name(name);
    }

    /// Settlement search keystroke; the fetch waits for the debounce
    pub fn search_settlements(&mut self, text: &str) -> Vec<Effect> {
        self.search_text = text.trim().to_string();
        if self.search_text.is_empty() {
            self.search.cancel(Level::SettlementSearch);
            self.store.search_settlements("");
            return Vec::new();
        }
        vec![Effect::Debounce(self.search.arm(Level::SettlementSearch))]
    }

    pub fn debounce_elapsed(&mut self, timer: DebounceTimer<Level>) -> Vec<Effect> {
        if !self.search.fires(&timer) {
            return Vec::new();
        }
        let text = self.search_text.clone();
        self.store.search_settlements(&text).map(Effect::Fetch).into_iter().collect()
    }

    /// Re-issue a failed (or any) level fetch
    pub fn retry(&mut self, level: Level) -> Vec<Effect> {
        self.store.retry(level).map(Effect::Fetch).into_iter().collect()
    }

    pub fn toggle_use_device_location(&mut self, on: bool) -> Vec<Effect> {
        if !on {
            self.cancel_autofill();
        }
        match self.coords.toggle_use_device_location(on) {
            ToggleOutcome::AcquireNeeded => vec![Effect::AcquirePosition],
            ToggleOutcome::Adopted | ToggleOutcome::Released => Vec::new(),
        }
    }

    /// Map widget callback
    pub fn map_point_chosen(&mut self, coords: Coordinates) -> Result<()> {
        coords.validate()?;
        self.cancel_autofill();
        self.address_country = None;
        let point = self.coords.map_point_chosen(coords);
        debug!(form = %self.id, "Map point chosen at {:?}", point.coords);
        Ok(())
    }

    pub fn position_resolved(
        &mut self,
        result: std::result::Result<GeoPoint, GeoError>,
    ) -> Vec<Effect> {
        match result {
            Ok(point) => {
                if !self.coords.device_location_resolved(point.coords) {
                    return Vec::new();
                }
                info!(form = %self.id, "Using device location {:?}", point.coords);
                self.cancel_autofill();
                self.address_country = None;
                let generation = self.lookups.issue(());
                self.coords
                    .coordinates()
                    .map(|point| Effect::ReverseGeocode { point, generation })
                    .into_iter()
                    .collect()
            }
            Err(error) => {
                if self.coords.device_location_failed(error) {
                    info!(form = %self.id, "Device location unavailable: {}", error);
                }
                Vec::new()
            }
        }
    }

    /// Reverse geocoding finished for a device point
    pub fn address_resolved(
        &mut self,
        origin: GeoPoint,
        generation: Generation,
        address: Option<RawAddress>,
    ) -> Vec<Effect> {
        if !self.lookups.is_current((), generation) {
            return Vec::new();
        }
        let Some(address) = address else {
            debug!(form = %self.id, "No address for device point; manual entry");
            return Vec::new();
        };
        if self.coords.coordinates() != Some(origin) {
            debug!(form = %self.id, "Coordinates moved on since lookup; skipping auto-fill");
            return Vec::new();
        }

        if self.snap_to_address {
            if let Some(location) = address.location {
                self.coords.snap_to_address(origin, location);
            }
        }

        // Snapping moves the point; a held address belongs to where it landed
        let origin = self.coords.coordinates().unwrap_or(origin);
        self.autofill_from_address(origin, address)
    }

    /// A hierarchy fetch finished
    pub fn fetch_completed(
        &mut self,
        ticket: &FetchTicket,
        result: Result<FetchPayload>,
    ) -> Vec<Effect> {
        match self.store.apply(ticket, result) {
            ApplyOutcome::Applied if ticket.level() == Level::Countries => {
                match self.pending_address.take() {
                    Some((origin, address)) if self.coords.coordinates() == Some(origin) => {
                        self.autofill_from_address(origin, address)
                    }
                    Some(_) => {
                        debug!(form = %self.id, "Coordinates moved on; dropping held address");
                        Vec::new()
                    }
                    None => Vec::new(),
                }
            }
            ApplyOutcome::Applied => self.continue_autofill(ticket.level()),
            ApplyOutcome::Failed(_) => {
                self.autofill = None;
                Vec::new()
            }
            ApplyOutcome::Stale => Vec::new(),
        }
    }

    /// The user took over; stop filling levels from the address
    fn cancel_autofill(&mut self) {
        self.autofill = None;
        self.pending_address = None;
    }

    /// A pending settlement search belongs to the community it was typed in
    fn cancel_search(&mut self) {
        self.search.cancel(Level::SettlementSearch);
        self.search_text.clear();
    }

    fn autofill_from_address(&mut self, origin: GeoPoint, address: RawAddress) -> Vec<Effect> {
        if self.store.countries().status != FetchStatus::Succeeded {
            debug!(form = %self.id, "Country list not loaded yet; holding address");
            self.pending_address = Some((origin, address));
            return Vec::new();
        }
        match match_address(&address, &self.store.countries().items) {
            Some(found) => {
                self.address_country = Some(found.country.id);
                self.start_autofill(found)
            }
            None => {
                debug!(form = %self.id, "Address country not in list; manual entry");
                Vec::new()
            }
        }
    }

    fn start_autofill(&mut self, found: AddressMatch) -> Vec<Effect> {
        let autofill = Autofill {
            region_name: found.region_name,
            community_name: found.community_name,
            settlement_name: found.settlement_name,
        };

        match self.store.country_id() {
            Some(id) if id != found.country.id => {
                debug!(form = %self.id, "Country already chosen by hand; not auto-filling");
                Vec::new()
            }
            Some(_) => {
                info!(form = %self.id, "Auto-filling below {}", found.country.name);
                self.autofill = Some(autofill);
                if self.store.regions().status == FetchStatus::Succeeded {
                    self.continue_autofill(Level::Regions)
                } else {
                    Vec::new()
                }
            }
            None => {
                info!(form = %self.id, "Auto-filling country {}", found.country.name);
                self.autofill = Some(autofill);
                match self.store.select_country(Some(found.country.id)) {
                    Ok(ticket) => ticket.map(Effect::Fetch).into_iter().collect(),
                    Err(_) => {
                        self.autofill = None;
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Apply the pending auto-fill name for the level that just loaded
    fn continue_autofill(&mut self, loaded: Level) -> Vec<Effect> {
        let Some(autofill) = self.autofill.as_mut() else {
            return Vec::new();
        };

        let ticket = match loaded {
            Level::Regions if self.store.region_id().is_none() => {
                let found = autofill
                    .region_name
                    .as_deref()
                    .and_then(|name| match_region(name, &self.store.regions().items))
                    .map(|r| r.id);
                found.and_then(|id| self.store.select_region(Some(id)).ok().flatten())
            }
            Level::Communities if self.store.community_id().is_none() => {
                let found = autofill
                    .community_name
                    .as_deref()
                    .and_then(|name| match_community(name, &self.store.communities().items))
                    .map(|c| c.id);
                found.and_then(|id| self.store.select_community(Some(id)).ok().flatten())
            }
            Level::Settlements => {
                if self.store.settlement_name().is_none() {
                    if let Some(name) = autofill.settlement_name.take() {
                        self.store.set_settlement_name(&name);
                    }
                }
                None
            }
            Level::Countries | Level::SettlementSearch => return Vec::new(),
            _ => None,
        };

        match ticket {
            Some(ticket) => vec![Effect::Fetch(ticket)],
            None => {
                debug!(form = %self.id, "Auto-fill finished at {} level", loaded);
                self.autofill = None;
                Vec::new()
            }
        }
    }
}
