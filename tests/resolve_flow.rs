//! End-to-end location form runs against mocked catalog and geocoder.

use listing_locator::config::Config;
use listing_locator::form::Notice;
use listing_locator::geo::{DeniedPositionSource, FixedPositionSource, ReverseGeocodeClient};
use listing_locator::hierarchy::{CatalogClient, Level};
use listing_locator::{Coordinates, GeoPoint, LocationSession};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_catalog(server: &MockServer) {
    let routes = [
        (
            "/countries",
            None,
            serde_json::json!({ "data": [
                { "id": 1, "name": "Україна", "isoCode": "UA" },
                { "id": 2, "name": "Polska", "isoCode": "PL" }
            ]}),
        ),
        (
            "/regions",
            Some(("countryId", "1")),
            serde_json::json!({ "data": [
                { "id": 10, "name": "Львівська", "countryId": 1 },
                { "id": 11, "name": "Тернопільська", "countryId": 1 }
            ]}),
        ),
        (
            "/communities",
            Some(("regionId", "11")),
            serde_json::json!({ "data": [
                { "id": 110, "name": "Тернопільська міська громада", "regionId": 11 }
            ]}),
        ),
        (
            "/locations",
            Some(("communityId", "110")),
            serde_json::json!({ "data": [
                { "id": 1100, "name": "Тернопіль", "communityId": 110 },
                { "id": 1101, "name": "Петриків", "communityId": 110 }
            ]}),
        ),
    ];

    for (route, param, body) in routes {
        let mock = Mock::given(method("GET")).and(path(route));
        let mock = match param {
            Some((key, value)) => mock.and(query_param(key, value)),
            None => mock,
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(server)
            .await;
    }
}

async fn mount_geocoder(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": "49.5534",
            "lon": "25.5947",
            "address": {
                "city": "Тернопіль",
                "municipality": "Тернопільська міська громада",
                "state": "Тернопільська область",
                "country": "Україна",
                "country_code": "ua"
            }
        })))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.geocoder.url = server.uri();
    config
}

#[tokio::test]
async fn device_location_fills_every_level() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    mount_geocoder(&server).await;

    let config = config_for(&server);
    let mut session = LocationSession::new(
        &config,
        CatalogClient::new(&config.api).expect("catalog client"),
        ReverseGeocodeClient::new(&config.geocoder).expect("geocoder client"),
        FixedPositionSource::new(49.5535, 25.5948),
    );

    session.open();
    session.toggle_use_device_location(true);
    session.settle().await;

    let selection = session.selection();
    assert_eq!(selection.country_id, Some(1));
    assert_eq!(selection.region_id, Some(11));
    assert_eq!(selection.community_id, Some(110));
    assert_eq!(selection.settlement_name.as_deref(), Some("Тернопіль"));
    assert_eq!(selection.coordinates, Some(GeoPoint::device(49.5535, 25.5948)));
    assert!(selection.use_device_location);
    assert!(selection.is_resolved());

    let store = session.form().store();
    assert_eq!(store.settlement().map(|s| s.id), Some(1100));
    assert!(session.notices().is_empty());
}

#[tokio::test]
async fn manual_entry_without_device() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let config = config_for(&server);
    let mut session = LocationSession::new(
        &config,
        CatalogClient::new(&config.api).expect("catalog client"),
        ReverseGeocodeClient::new(&config.geocoder).expect("geocoder client"),
        DeniedPositionSource,
    );

    session.open();
    session.toggle_use_device_location(true);
    session.settle().await;
    assert!(matches!(session.notices().as_slice(), [Notice::LocationUnavailable { .. }]));

    session.select_country(Some(1)).expect("country is listed");
    session.settle().await;
    session.select_region(Some(11)).expect("region is listed");
    session.settle().await;
    session.select_community(Some(110)).expect("community is listed");
    session.settle().await;
    session.set_settlement_name("Петриків");
    session
        .map_point_chosen(Coordinates::new(49.60, 25.52))
        .expect("valid point");

    let selection = session.selection();
    assert!(!selection.use_device_location);
    assert_eq!(selection.coordinates, Some(GeoPoint::manual(49.60, 25.52)));
    assert!(selection.is_resolved());
    assert_eq!(session.form().store().settlement().map(|s| s.id), Some(1101));
}

#[tokio::test]
async fn unreachable_catalog_reports_failed_level() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut session = LocationSession::new(
        &config,
        CatalogClient::new(&config.api).expect("catalog client"),
        ReverseGeocodeClient::new(&config.geocoder).expect("geocoder client"),
        DeniedPositionSource,
    );

    session.open();
    session.settle().await;

    assert!(matches!(
        session.notices().as_slice(),
        [Notice::HierarchyFetchFailed { level: Level::Countries, .. }]
    ));
    assert!(session.select_country(Some(1)).is_err());
}
