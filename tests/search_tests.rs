// Integration tests for radius search and the search service

mod common;

use std::sync::Arc;

use common::{contact, named, north_of, with_field, MockDirectory, MockGeocoder};
use nearby_contacts::core::{
    CoordinateFields, FieldKind, NearbyService, RadiusSearchEngine, SearchError,
    SearchHistoryStore, SortKey, SortableField,
};
use nearby_contacts::models::{Contact, Coordinate, SearchQuery};
use nearby_contacts::services::{ContactSnapshot, MemoryStore};
use nearby_contacts::distance_miles;

const ANCHOR: Coordinate = Coordinate::new(40.0, -75.0);

fn engine() -> RadiusSearchEngine {
    RadiusSearchEngine::new(CoordinateFields::default())
}

fn ids(results: &[nearby_contacts::EnrichedContact]) -> Vec<&str> {
    results.iter().map(|r| r.contact.id.as_str()).collect()
}

fn sortable() -> Vec<SortableField> {
    vec![
        SortableField {
            name: "lifetime_value".to_string(),
            field: "contact.lifetime_value".to_string(),
            kind: FieldKind::Numeric,
        },
        SortableField {
            name: "last_order_date".to_string(),
            field: "contact.last_order_date".to_string(),
            kind: FieldKind::Date,
        },
    ]
}

fn service_with(contacts: Vec<Contact>, geocoder: MockGeocoder, inspect: bool) -> NearbyService {
    service_for_account(contacts, geocoder, inspect, "loc_1")
}

fn service_for_account(
    contacts: Vec<Contact>,
    geocoder: MockGeocoder,
    inspect: bool,
    account_id: &str,
) -> NearbyService {
    let directory = Arc::new(MockDirectory::new(contacts));
    let snapshot = Arc::new(ContactSnapshot::new(directory, account_id.to_string()));
    let history = Arc::new(SearchHistoryStore::new(
        Arc::new(MemoryStore::new()),
        "history:loc_1".to_string(),
        5,
    ));
    NearbyService::new(
        engine(),
        Arc::new(geocoder),
        snapshot,
        history,
        sortable(),
        inspect,
    )
}

fn query(address: &str, radius_miles: f64, sort_key: &str) -> SearchQuery {
    SearchQuery {
        address: address.to_string(),
        anchor: None,
        radius_miles,
        sort_key: sort_key.to_string(),
        name_filter: None,
    }
}

#[test]
fn test_radius_keeps_only_contacts_inside() {
    let contacts = vec![
        contact("a", 1, Some(north_of(ANCHOR, 9.9))),
        contact("b", 2, Some(north_of(ANCHOR, 10.1))),
        contact("c", 3, None),
    ];

    let results = engine().search(&contacts, ANCHOR, 10.0, &SortKey::Distance);

    assert_eq!(ids(&results), vec!["a"]);
    assert!((results[0].distance_miles - 9.9).abs() < 1e-6);
}

#[test]
fn test_radius_boundary_is_inclusive() {
    let point = north_of(ANCHOR, 7.5);
    let exact = distance_miles(ANCHOR, point);
    let contacts = vec![contact("edge", 1, Some(point))];

    let results = engine().search(&contacts, ANCHOR, exact, &SortKey::Distance);
    assert_eq!(ids(&results), vec!["edge"]);
}

#[test]
fn test_contacts_without_address_are_skipped() {
    let mut no_address = contact("x", 1, Some(ANCHOR));
    no_address.address1 = None;
    no_address.city = None;
    no_address.state = None;

    let results = engine().search(&[no_address], ANCHOR, 50.0, &SortKey::Distance);
    assert!(results.is_empty());
}

#[test]
fn test_malformed_coordinate_is_skipped() {
    let bad = with_field(contact("bad", 1, None), "contact.custom_lat", "n/a");
    let bad = with_field(bad, "contact.custom_lng", "-75.0");
    let dirty = with_field(contact("dirty", 2, None), "contact.custom_lat", "lat: 40.01");
    let dirty = with_field(dirty, "contact.custom_lng", " -75.00 ");

    let results = engine().search(&[bad, dirty], ANCHOR, 5.0, &SortKey::Distance);
    assert_eq!(ids(&results), vec!["dirty"]);
}

#[test]
fn test_search_is_idempotent() {
    let contacts: Vec<Contact> = (1..=6)
        .map(|n| contact(&format!("c{}", n), n, Some(north_of(ANCHOR, n as f64))))
        .collect();

    let first = engine().search(&contacts, ANCHOR, 4.5, &SortKey::Distance);
    let second = engine().search(&contacts, ANCHOR, 4.5, &SortKey::Distance);

    assert_eq!(ids(&first), ids(&second));
    assert_eq!(ids(&first), vec!["c1", "c2", "c3", "c4"]);
}

#[test]
fn test_distance_sort_is_ascending() {
    let contacts = vec![
        contact("id1", 1, Some(north_of(ANCHOR, 5.0))),
        contact("id2", 2, Some(north_of(ANCHOR, 2.0))),
    ];

    let results = engine().search(&contacts, ANCHOR, 10.0, &SortKey::Distance);
    assert_eq!(ids(&results), vec!["id2", "id1"]);
}

#[test]
fn test_numeric_sort_is_descending_with_missing_last() {
    let key = SortKey::resolve("lifetime_value", &sortable()).unwrap();
    let contacts = vec![
        with_field(contact("low", 1, Some(north_of(ANCHOR, 1.0))), "contact.lifetime_value", "$120.50"),
        contact("none", 2, Some(north_of(ANCHOR, 0.5))),
        with_field(contact("high", 3, Some(north_of(ANCHOR, 3.0))), "contact.lifetime_value", "9,800"),
    ];

    let results = engine().search(&contacts, ANCHOR, 10.0, &key);
    assert_eq!(ids(&results), vec!["high", "low", "none"]);
}

#[test]
fn test_date_sort_is_most_recent_first() {
    let key = SortKey::resolve("last_order_date", &sortable()).unwrap();
    let contacts = vec![
        with_field(contact("old", 1, Some(north_of(ANCHOR, 1.0))), "contact.last_order_date", "2021-03-01"),
        with_field(contact("new", 2, Some(north_of(ANCHOR, 2.0))), "contact.last_order_date", "2024-11-20"),
        contact("never", 3, Some(north_of(ANCHOR, 0.1))),
    ];

    let results = engine().search(&contacts, ANCHOR, 10.0, &key);
    assert_eq!(ids(&results), vec!["new", "old", "never"]);
}

#[tokio::test]
async fn test_service_search_resolves_address() {
    let contacts = vec![
        contact("near", 1, Some(north_of(ANCHOR, 1.0))),
        contact("far", 2, Some(north_of(ANCHOR, 40.0))),
    ];
    let geocoder = MockGeocoder::new().with_location("100 Market St", ANCHOR);
    let service = service_with(contacts, geocoder, false);

    let outcome = service
        .run_search(&query("100 Market St, Philadelphia, PA", 10.0, "distance"))
        .await
        .unwrap();

    assert_eq!(outcome.anchor, ANCHOR);
    assert_eq!(outcome.searched, 2);
    assert_eq!(ids(&outcome.contacts), vec!["near"]);
}

#[tokio::test]
async fn test_service_accepts_explicit_anchor() {
    let geocoder = MockGeocoder::new();
    let service = service_with(vec![contact("near", 1, Some(north_of(ANCHOR, 1.0)))], geocoder, false);

    let mut q = query("", 5.0, "distance");
    q.anchor = Some(ANCHOR);
    let outcome = service.run_search(&q).await.unwrap();

    assert_eq!(ids(&outcome.contacts), vec!["near"]);
    assert_eq!(service.history().await[0].address, "40.000000, -75.000000");
}

#[tokio::test]
async fn test_unresolvable_address_returns_no_results() {
    let geocoder = MockGeocoder::new().unresolvable("Nowhere");
    let service = service_with(vec![contact("near", 1, Some(ANCHOR))], geocoder, false);

    let err = service
        .run_search(&query("Nowhere, ZZ", 10.0, "distance"))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::UnresolvableAddress(_)));
    assert!(service.history().await.is_empty());
}

#[tokio::test]
async fn test_geocoder_failure_is_transport_error() {
    let geocoder = MockGeocoder::new().failing("Broken");
    let service = service_with(vec![], geocoder, false);

    let err = service
        .run_search(&query("Broken, PA", 10.0, "distance"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}

#[tokio::test]
async fn test_invalid_queries_are_rejected() {
    let service = service_with(vec![], MockGeocoder::new(), false);

    let unknown = service.run_search(&query("1 Main St", 5.0, "zodiac")).await;
    assert!(matches!(unknown, Err(SearchError::InvalidQuery(_))));

    let zero = service.run_search(&query("1 Main St", 0.0, "distance")).await;
    assert!(matches!(zero, Err(SearchError::InvalidQuery(_))));

    let blank = service.run_search(&query("   ", 5.0, "distance")).await;
    assert!(matches!(blank, Err(SearchError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_history_is_recorded_and_deduplicated() {
    let service = service_with(vec![], MockGeocoder::new(), false);

    service.run_search(&query("1 Main St", 5.0, "distance")).await.unwrap();
    service.run_search(&query("2 Main St", 5.0, "distance")).await.unwrap();
    service.run_search(&query("1 Main St", 8.0, "lifetime_value")).await.unwrap();

    let history = service.history().await;
    let addresses: Vec<&str> = history.iter().map(|h| h.address.as_str()).collect();
    assert_eq!(addresses, vec!["1 Main St", "2 Main St"]);
    assert_eq!(history[0].radius_miles, 8.0);
    assert_eq!(history[0].sort_key, "lifetime_value");
}

#[tokio::test]
async fn test_history_keeps_five_most_recent() {
    let service = service_with(vec![], MockGeocoder::new(), false);

    for n in 1..=7 {
        let address = format!("{} Main St", n);
        service.run_search(&query(&address, 5.0, "distance")).await.unwrap();
    }

    let history = service.history().await;
    let addresses: Vec<&str> = history.iter().map(|h| h.address.as_str()).collect();
    assert_eq!(
        addresses,
        vec!["7 Main St", "6 Main St", "5 Main St", "4 Main St", "3 Main St"]
    );
}

#[tokio::test]
async fn test_name_filter_narrows_results() {
    let contacts = vec![
        named("1", "Ada", "Lovelace", north_of(ANCHOR, 1.0)),
        named("2", "Alan", "Turing", north_of(ANCHOR, 2.0)),
        named("3", "Grace", "Hopper", north_of(ANCHOR, 3.0)),
    ];
    let geocoder = MockGeocoder::new().with_location("Center", ANCHOR);
    let service = service_with(contacts, geocoder, false);

    let mut q = query("Center", 10.0, "distance");
    q.name_filter = Some("TUR".to_string());
    let outcome = service.run_search(&q).await.unwrap();
    assert_eq!(ids(&outcome.contacts), vec!["2"]);

    q.name_filter = Some("a".to_string());
    let outcome = service.run_search(&q).await.unwrap();
    assert_eq!(ids(&outcome.contacts), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_missing_account_asks_to_reconnect() {
    let service = service_for_account(vec![], MockGeocoder::new(), false, "");

    let err = service
        .run_search(&query("1 Main St", 5.0, "distance"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::MissingCredential(_)));
}

#[tokio::test]
async fn test_debug_snapshot_is_gated() {
    let contacts = vec![contact("a", 1, Some(ANCHOR))];

    let hidden = service_with(contacts.clone(), MockGeocoder::new(), false);
    hidden.refresh_contacts().await.unwrap();
    assert!(hidden.debug_snapshot().await.is_none());

    let visible = service_with(contacts, MockGeocoder::new(), true);
    assert_eq!(visible.debug_snapshot().await.unwrap().len(), 0);
    visible.refresh_contacts().await.unwrap();
    assert_eq!(visible.debug_snapshot().await.unwrap().len(), 1);
    assert!(visible.snapshot_loaded_at().await.is_some());
}
