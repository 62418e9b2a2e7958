//! Cascading hierarchy state
//!
//! Holds the loaded lists and the current selection for each level. Loading
//! a level is split at the network boundary: `load_*` mutates state and
//! returns a [`FetchTicket`]; whoever runs the fetch hands the result back
//! through [`HierarchyStore::apply`], which drops it if a newer request for
//! the same level was issued in the meantime.
//!
//! Invariants held between calls:
//! - every loaded child belongs to the currently selected parent
//! - a selected region/community id is present in its loaded list
//! - changing a parent empties all child lists and selections immediately

use crate::error::{Error, Result};
use crate::hierarchy::{
    Community, Country, FetchPayload, FetchRequest, Level, Region, Settlement,
};
use crate::matcher::fold;
use crate::request::{Generation, RequestCoordinator};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Items and fetch status for one level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState<T> {
    pub status: FetchStatus,
    pub items: Vec<T>,
    pub error: Option<String>,
    pub generation: Generation,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            items: Vec::new(),
            error: None,
            generation: Generation::default(),
        }
    }
}

impl<T> FetchState<T> {
    fn set(&mut self, status: FetchStatus, generation: Generation) {
        self.status = status;
        self.items.clear();
        self.error = None;
        self.generation = generation;
    }

    fn succeed(&mut self, items: Vec<T>) {
        self.status = FetchStatus::Succeeded;
        self.items = items;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        self.status = FetchStatus::Failed;
        self.items.clear();
        self.error = Some(message);
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// A fetch issued by the store, to be answered through [`HierarchyStore::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub request: FetchRequest,
    pub generation: Generation,
}

impl FetchTicket {
    pub fn level(&self) -> Level {
        self.request.level()
    }
}

/// What happened to a fetch result handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The fetch failed; the level is now `Failed` with this message
    Failed(String),
    /// A newer request superseded this one; nothing changed
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyStore {
    countries: FetchState<Country>,
    regions: FetchState<Region>,
    communities: FetchState<Community>,
    settlements: FetchState<Settlement>,
    suggestions: FetchState<Settlement>,

    country_id: Option<i64>,
    region_id: Option<i64>,
    community_id: Option<i64>,
    settlement_name: Option<String>,

    requests: RequestCoordinator<Level>,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn countries(&self) -> &FetchState<Country> {
        &self.countries
    }

    pub fn regions(&self) -> &FetchState<Region> {
        &self.regions
    }

    pub fn communities(&self) -> &FetchState<Community> {
        &self.communities
    }

    pub fn settlements(&self) -> &FetchState<Settlement> {
        &self.settlements
    }

    /// Results of the latest settlement search
    pub fn suggestions(&self) -> &FetchState<Settlement> {
        &self.suggestions
    }

    pub fn country_id(&self) -> Option<i64> {
        self.country_id
    }

    pub fn region_id(&self) -> Option<i64> {
        self.region_id
    }

    pub fn community_id(&self) -> Option<i64> {
        self.community_id
    }

    pub fn settlement_name(&self) -> Option<&str> {
        self.settlement_name.as_deref()
    }

    pub fn country(&self) -> Option<&Country> {
        let id = self.country_id?;
        self.countries.items.iter().find(|c| c.id == id)
    }

    pub fn region(&self) -> Option<&Region> {
        let id = self.region_id?;
        self.regions.items.iter().find(|r| r.id == id)
    }

    pub fn community(&self) -> Option<&Community> {
        let id = self.community_id?;
        self.communities.items.iter().find(|c| c.id == id)
    }

    /// The known settlement whose name equals the typed name, if any
    pub fn settlement(&self) -> Option<&Settlement> {
        let name = fold(self.settlement_name.as_deref()?);
        self.settlements.items.iter().find(|s| fold(&s.name) == name)
    }

    /// (Re)load the country list; clears every selection
    pub fn load_countries(&mut self) -> FetchTicket {
        self.begin(FetchRequest::Countries)
    }

    /// Make `country_id` the selected country and load its regions
    pub fn load_regions(&mut self, country_id: i64) -> Result<FetchTicket> {
        if !self.countries.items.iter().any(|c| c.id == country_id) {
            return Err(Error::UnknownSelection {
                level: Level::Countries,
                id: country_id,
            });
        }
        let ticket = self.begin(FetchRequest::Regions { country_id });
        self.country_id = Some(country_id);
        Ok(ticket)
    }

    /// Make `region_id` the selected region and load its communities
    pub fn load_communities(&mut self, region_id: i64) -> Result<FetchTicket> {
        if !self.regions.items.iter().any(|r| r.id == region_id) {
            return Err(Error::UnknownSelection {
                level: Level::Regions,
                id: region_id,
            });
        }
        let ticket = self.begin(FetchRequest::Communities { region_id });
        self.region_id = Some(region_id);
        Ok(ticket)
    }

    /// Make `community_id` the selected community and load its settlements
    pub fn load_settlements(&mut self, community_id: i64) -> Result<FetchTicket> {
        if !self.communities.items.iter().any(|c| c.id == community_id) {
            return Err(Error::UnknownSelection {
                level: Level::Communities,
                id: community_id,
            });
        }
        let ticket = self.begin(FetchRequest::Settlements { community_id });
        self.community_id = Some(community_id);
        Ok(ticket)
    }

    /// Select a country (or clear it); returns the region fetch to run
    pub fn select_country(&mut self, country_id: Option<i64>) -> Result<Option<FetchTicket>> {
        match country_id {
            Some(id) => self.load_regions(id).map(Some),
            None => {
                self.country_id = None;
                self.reset(Level::Regions);
                self.reset_children(Level::Regions);
                Ok(None)
            }
        }
    }

    /// Select a region (or clear it); returns the community fetch to run
    pub fn select_region(&mut self, region_id: Option<i64>) -> Result<Option<FetchTicket>> {
        match region_id {
            Some(id) => self.load_communities(id).map(Some),
            None => {
                self.region_id = None;
                self.reset(Level::Communities);
                self.reset_children(Level::Communities);
                Ok(None)
            }
        }
    }

    /// Select a community (or clear it); returns the settlement fetch to run
    pub fn select_community(&mut self, community_id: Option<i64>) -> Result<Option<FetchTicket>> {
        match community_id {
            Some(id) => self.load_settlements(id).map(Some),
            None => {
                self.community_id = None;
                self.reset(Level::Settlements);
                self.reset_children(Level::Settlements);
                Ok(None)
            }
        }
    }

    /// Set the settlement as free text; it need not be in the loaded list
    pub fn set_settlement_name(&mut self, name: &str) {
        let name = name.trim();
        self.settlement_name = (!name.is_empty()).then(|| name.to_string());
    }

    /// Issue a settlement search in the selected community
    ///
    /// Blank text, or no community selected, clears the suggestions instead.
    pub fn search_settlements(&mut self, query: &str) -> Option<FetchTicket> {
        let query = query.trim();
        match self.community_id {
            Some(community_id) if !query.is_empty() => Some(self.begin(
                FetchRequest::SettlementSearch {
                    community_id,
                    query: query.to_string(),
                },
            )),
            _ => {
                self.reset(Level::SettlementSearch);
                None
            }
        }
    }

    /// Re-issue the fetch for a level using its current parent
    pub fn retry(&mut self, level: Level) -> Option<FetchTicket> {
        match level {
            Level::Countries => Some(self.load_countries()),
            Level::Regions => self.load_regions(self.country_id?).ok(),
            Level::Communities => self.load_communities(self.region_id?).ok(),
            Level::Settlements => self.load_settlements(self.community_id?).ok(),
            // Searches carry their text; re-run one with search_settlements
            Level::SettlementSearch => None,
        }
    }

    /// Hand a fetch result back to the store
    ///
    /// Applied only if the ticket is still the latest issued for its level.
    pub fn apply(&mut self, ticket: &FetchTicket, result: Result<FetchPayload>) -> ApplyOutcome {
        let level = ticket.level();
        if !self.requests.is_current(level, ticket.generation) {
            debug!(
                "Discarding {} response {} (current {})",
                level,
                ticket.generation,
                self.requests.current(level)
            );
            return ApplyOutcome::Stale;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => return self.fail(level, e.to_string()),
        };

        match (&ticket.request, payload) {
            (FetchRequest::Countries, FetchPayload::Countries(items)) => {
                self.countries.succeed(items);
            }
            (FetchRequest::Regions { country_id }, FetchPayload::Regions(items)) => {
                let items = keep_matching(items, level, |r| r.country_id == *country_id);
                self.regions.succeed(items);
            }
            (FetchRequest::Communities { region_id }, FetchPayload::Communities(items)) => {
                let items = keep_matching(items, level, |c| c.region_id == *region_id);
                self.communities.succeed(items);
            }
            (FetchRequest::Settlements { community_id }, FetchPayload::Settlements(items)) => {
                let items = keep_matching(items, level, |s| s.community_id == *community_id);
                self.settlements.succeed(items);
            }
            (
                FetchRequest::SettlementSearch { community_id, .. },
                FetchPayload::Settlements(items),
            ) => {
                let items = keep_matching(items, level, |s| s.community_id == *community_id);
                self.suggestions.succeed(items);
            }
            _ => {
                return self.fail(level, format!("unexpected payload for {} request", level));
            }
        }

        debug!("Applied {} response {}", level, ticket.generation);
        ApplyOutcome::Applied
    }

    fn fail(&mut self, level: Level, message: String) -> ApplyOutcome {
        warn!("Loading {} list failed: {}", level, message);
        match level {
            Level::Countries => self.countries.fail(message.clone()),
            Level::Regions => self.regions.fail(message.clone()),
            Level::Communities => self.communities.fail(message.clone()),
            Level::Settlements => self.settlements.fail(message.clone()),
            Level::SettlementSearch => self.suggestions.fail(message.clone()),
        }
        ApplyOutcome::Failed(message)
    }

    /// Issue a request: new generation, children emptied, level loading
    fn begin(&mut self, request: FetchRequest) -> FetchTicket {
        let level = request.level();
        self.reset_children(level);
        let generation = self.requests.issue(level);
        self.set_level(level, FetchStatus::Loading, generation);
        FetchTicket {
            request,
            generation,
        }
    }

    /// Return a level to idle and void anything in flight for it
    fn reset(&mut self, level: Level) {
        let generation = self.requests.issue(level);
        self.set_level(level, FetchStatus::Idle, generation);
    }

    fn reset_children(&mut self, level: Level) {
        for child in level.children() {
            self.reset(*child);
        }
    }

    /// Set a level's status and clear its items and selection
    ///
    /// The settlement name survives a settlement reload; it is cleared only
    /// when the settlement list is reset because its parent changed.
    fn set_level(&mut self, level: Level, status: FetchStatus, generation: Generation) {
        match level {
            Level::Countries => {
                self.countries.set(status, generation);
                self.country_id = None;
            }
            Level::Regions => {
                self.regions.set(status, generation);
                self.region_id = None;
            }
            Level::Communities => {
                self.communities.set(status, generation);
                self.community_id = None;
            }
            Level::Settlements => {
                self.settlements.set(status, generation);
                if status == FetchStatus::Idle {
                    self.settlement_name = None;
                }
            }
            Level::SettlementSearch => {
                self.suggestions.set(status, generation);
            }
        }
    }
}

/// Drop entries that belong to a different parent
fn keep_matching<T>(items: Vec<T>, level: Level, belongs: impl Fn(&T) -> bool) -> Vec<T> {
    let total = items.len();
    let kept: Vec<T> = items.into_iter().filter(|item| belongs(item)).collect();
    if kept.len() < total {
        warn!(
            "Dropped {} {} entries belonging to another parent",
            total - kept.len(),
            level
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ukraine() -> Country {
        Country {
            id: 1,
            name: "Україна".to_string(),
            iso_code: "UA".to_string(),
            latitude: Some(48.38),
            longitude: Some(31.17),
        }
    }

    fn poland() -> Country {
        Country {
            id: 2,
            name: "Polska".to_string(),
            iso_code: "PL".to_string(),
            latitude: None,
            longitude: None,
        }
    }

    fn region(id: i64, name: &str, country_id: i64) -> Region {
        Region {
            id,
            name: name.to_string(),
            country_id,
        }
    }

    fn community(id: i64, name: &str, region_id: i64) -> Community {
        Community {
            id,
            name: name.to_string(),
            region_id,
        }
    }

    fn settlement(id: i64, name: &str, community_id: i64) -> Settlement {
        Settlement {
            id,
            name: name.to_string(),
            community_id,
        }
    }

    /// Store with countries loaded
    fn loaded_store() -> HierarchyStore {
        let mut store = HierarchyStore::new();
        let ticket = store.load_countries();
        let outcome = store.apply(&ticket, Ok(FetchPayload::Countries(vec![ukraine(), poland()])));
        assert_eq!(outcome, ApplyOutcome::Applied);
        store
    }

    /// Store with Ukraine → Ternopil → Ternopil community → settlements loaded
    fn deep_store() -> HierarchyStore {
        let mut store = loaded_store();

        let t = store.select_country(Some(1)).unwrap().unwrap();
        store.apply(&t, Ok(FetchPayload::Regions(vec![region(10, "Тернопільська", 1)])));

        let t = store.select_region(Some(10)).unwrap().unwrap();
        store.apply(
            &t,
            Ok(FetchPayload::Communities(vec![community(100, "Тернопільська", 10)])),
        );

        let t = store.select_community(Some(100)).unwrap().unwrap();
        store.apply(
            &t,
            Ok(FetchPayload::Settlements(vec![settlement(1000, "Тернопіль", 100)])),
        );
        store.set_settlement_name("Тернопіль");
        store
    }

    fn assert_parentage(store: &HierarchyStore) {
        for r in &store.regions().items {
            assert_eq!(Some(r.country_id), store.country_id());
        }
        for c in &store.communities().items {
            assert_eq!(Some(c.region_id), store.region_id());
        }
        for s in &store.settlements().items {
            assert_eq!(Some(s.community_id), store.community_id());
        }
        if let Some(id) = store.region_id() {
            assert!(store.regions().items.iter().any(|r| r.id == id));
        }
        if let Some(id) = store.community_id() {
            assert!(store.communities().items.iter().any(|c| c.id == id));
        }
    }

    #[test]
    fn test_load_sets_loading_and_generation() {
        let mut store = loaded_store();
        let ticket = store.load_regions(1).unwrap();

        assert_eq!(store.regions().status, FetchStatus::Loading);
        assert_eq!(store.regions().generation, ticket.generation);
        assert_eq!(store.country_id(), Some(1));
    }

    #[test]
    fn test_new_country_clears_children_synchronously() {
        let mut store = deep_store();
        assert_eq!(store.community_id(), Some(100));

        let _pending = store.select_country(Some(2)).unwrap();

        assert!(store.regions().items.is_empty());
        assert!(store.communities().items.is_empty());
        assert!(store.settlements().items.is_empty());
        assert_eq!(store.region_id(), None);
        assert_eq!(store.community_id(), None);
        assert_eq!(store.settlement_name(), None);
        assert_eq!(store.communities().status, FetchStatus::Idle);
        assert_parentage(&store);
    }

    #[test]
    fn test_stale_region_response_is_dropped() {
        let mut store = loaded_store();

        let g1 = store.select_country(Some(1)).unwrap().unwrap();
        let g2 = store.select_country(Some(2)).unwrap().unwrap();

        let polish = vec![region(20, "Mazowieckie", 2)];
        assert_eq!(
            store.apply(&g2, Ok(FetchPayload::Regions(polish.clone()))),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.apply(&g1, Ok(FetchPayload::Regions(vec![region(10, "Тернопільська", 1)]))),
            ApplyOutcome::Stale
        );

        assert_eq!(store.regions().items, polish);
        assert_eq!(store.regions().status, FetchStatus::Succeeded);
        assert_parentage(&store);
    }

    #[test]
    fn test_stale_failure_does_not_mark_failed() {
        let mut store = loaded_store();

        let g1 = store.select_country(Some(1)).unwrap().unwrap();
        let _g2 = store.select_country(Some(2)).unwrap().unwrap();

        let outcome = store.apply(&g1, Err(Error::Catalog("boom".to_string())));
        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(store.regions().status, FetchStatus::Loading);
        assert_eq!(store.regions().error, None);
    }

    #[test]
    fn test_clearing_parent_voids_in_flight_fetch() {
        let mut store = loaded_store();
        let ticket = store.select_country(Some(1)).unwrap().unwrap();

        store.select_country(None).unwrap();
        assert_eq!(store.regions().status, FetchStatus::Idle);

        let outcome = store.apply(&ticket, Ok(FetchPayload::Regions(vec![region(10, "x", 1)])));
        assert_eq!(outcome, ApplyOutcome::Stale);
        assert!(store.regions().items.is_empty());
    }

    #[test]
    fn test_failure_then_retry() {
        let mut store = loaded_store();
        let ticket = store.select_country(Some(1)).unwrap().unwrap();

        let outcome = store.apply(&ticket, Err(Error::Catalog("503".to_string())));
        assert!(matches!(outcome, ApplyOutcome::Failed(ref m) if m.contains("503")));
        assert_eq!(store.regions().status, FetchStatus::Failed);
        assert!(store.communities().items.is_empty());
        // Higher level stays usable
        assert_eq!(store.country_id(), Some(1));

        let retry = store.retry(Level::Regions).unwrap();
        assert_eq!(store.regions().status, FetchStatus::Loading);
        assert_eq!(store.regions().error, None);

        store.apply(&retry, Ok(FetchPayload::Regions(vec![region(10, "Тернопільська", 1)])));
        assert_eq!(store.regions().status, FetchStatus::Succeeded);
        assert_eq!(store.regions().items.len(), 1);
    }

    #[test]
    fn test_unknown_selection_rejected() {
        let mut store = loaded_store();
        assert!(matches!(
            store.select_country(Some(99)),
            Err(Error::UnknownSelection { level: Level::Countries, id: 99 })
        ));

        let t = store.select_country(Some(1)).unwrap().unwrap();
        store.apply(&t, Ok(FetchPayload::Regions(vec![region(10, "Тернопільська", 1)])));

        assert!(store.select_region(Some(11)).is_err());
        assert_eq!(store.region_id(), None);
    }

    #[test]
    fn test_foreign_children_filtered() {
        let mut store = loaded_store();
        let t = store.select_country(Some(1)).unwrap().unwrap();

        store.apply(
            &t,
            Ok(FetchPayload::Regions(vec![
                region(10, "Тернопільська", 1),
                region(20, "Mazowieckie", 2),
            ])),
        );

        assert_eq!(store.regions().items.len(), 1);
        assert_parentage(&store);
    }

    #[test]
    fn test_mismatched_payload_fails_level() {
        let mut store = loaded_store();
        let t = store.select_country(Some(1)).unwrap().unwrap();

        let outcome = store.apply(&t, Ok(FetchPayload::Communities(vec![])));
        assert!(matches!(outcome, ApplyOutcome::Failed(_)));
        assert_eq!(store.regions().status, FetchStatus::Failed);
    }

    #[test]
    fn test_region_change_keeps_country() {
        let mut store = deep_store();
        store.select_region(None).unwrap();

        assert_eq!(store.country_id(), Some(1));
        assert_eq!(store.regions().items.len(), 1);
        assert_eq!(store.community_id(), None);
        assert_eq!(store.communities().status, FetchStatus::Idle);
        assert_eq!(store.settlement_name(), None);
    }

    #[test]
    fn test_settlement_free_text() {
        let mut store = deep_store();
        assert_eq!(store.settlement().map(|s| s.id), Some(1000));

        store.set_settlement_name("  Нове Село ");
        assert_eq!(store.settlement_name(), Some("Нове Село"));
        assert!(store.settlement().is_none());

        store.set_settlement_name("   ");
        assert_eq!(store.settlement_name(), None);
    }

    #[test]
    fn test_settlement_reload_keeps_typed_name() {
        let mut store = deep_store();
        store.retry(Level::Settlements).unwrap();
        assert_eq!(store.settlement_name(), Some("Тернопіль"));
    }

    #[test]
    fn test_search_requires_community() {
        let mut store = loaded_store();
        assert!(store.search_settlements("Тер").is_none());

        let mut store = deep_store();
        let first = store.search_settlements("Те").unwrap();
        let second = store.search_settlements("Тер").unwrap();

        let found = vec![settlement(1000, "Тернопіль", 100)];
        assert_eq!(
            store.apply(&first, Ok(FetchPayload::Settlements(vec![]))),
            ApplyOutcome::Stale
        );
        assert_eq!(
            store.apply(&second, Ok(FetchPayload::Settlements(found.clone()))),
            ApplyOutcome::Applied
        );
        assert_eq!(store.suggestions().items, found);

        // Searching doesn't disturb the main settlement list
        assert_eq!(store.settlements().items.len(), 1);

        assert!(store.search_settlements("").is_none());
        assert!(store.suggestions().items.is_empty());
    }
}
