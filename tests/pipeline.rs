mod support;

use std::collections::BTreeMap;

use hazard_atlas::domain::{
    advisory::Category,
    filter::{AltitudeRange, FilterState},
};
use serde_json::json;
use time::macros::datetime;

use support::{StubUpstream, advisory_service};

const NOW: time::OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

fn pentagon() -> serde_json::Value {
    json!([
        {"lon": -100.0, "lat": 40.0},
        {"lon": -98.0, "lat": 40.0},
        {"lon": -97.0, "lat": 42.0},
        {"lon": -99.0, "lat": 43.0},
        {"lon": -101.0, "lat": 42.0}
    ])
}

#[tokio::test]
async fn intl_record_with_too_few_vertices_is_dropped() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "isigmet",
        json!([
            {"id": "A", "coords": pentagon(), "base": 50, "top": 180, "rawSigmet": "SIGMET A"},
            {"id": "B", "coords": [{"lon": 0, "lat": 0}, {"lon": 1, "lat": 1}], "base": 50, "top": 180}
        ]),
    );
    let service = advisory_service(upstream);

    let collection = service
        .feature_collection(BTreeMap::new(), &FilterState::default(), NOW)
        .await
        .expect("collection");

    assert_eq!(collection.len(), 1);
    let feature = &collection.features[0];
    assert_eq!(feature.id, "A");
    assert_eq!(feature.category, Category::Sigmet);
    assert_eq!(feature.geometry.ring().len(), 6);
    assert_eq!(feature.min_flight_level, Some(50.0));
    assert_eq!(feature.max_flight_level, Some(180.0));
}

#[tokio::test]
async fn air_sub_types_resolve_case_insensitively() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "airsigmet",
        json!([
            {"id": 1, "coords": pentagon(), "airSigmetType": "airmet", "altitudeHi1": 100},
            {"id": 2, "coords": pentagon(), "airSigmetType": "turbulence", "altitudeLow1": 0}
        ]),
    );
    let service = advisory_service(upstream);

    let collection = service
        .feature_collection(BTreeMap::new(), &FilterState::default(), NOW)
        .await
        .expect("collection");

    let categories: Vec<(&str, Category)> = collection
        .features
        .iter()
        .map(|f| (f.id.as_str(), f.category))
        .collect();
    assert_eq!(
        categories,
        vec![("1", Category::Airmet), ("2", Category::GAirmet)]
    );
}

#[tokio::test]
async fn intl_features_precede_air_features() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "isigmet",
        json!([{"id": "intl", "coords": pentagon(), "base": 0, "top": 300}]),
    );
    upstream.respond(
        "airsigmet",
        json!([{"id": "air", "coords": pentagon(), "airSigmetType": "SIGMET", "altitudeLow1": 0, "altitudeHi1": 300}]),
    );
    let service = advisory_service(upstream);

    let collection = service
        .feature_collection(BTreeMap::new(), &FilterState::default(), NOW)
        .await
        .expect("collection");

    let ids: Vec<&str> = collection.features.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["intl", "air"]);
}

#[tokio::test]
async fn filters_apply_to_the_merged_collection() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "isigmet",
        json!([
            {"id": "high", "coords": pentagon(), "base": 300, "top": 450},
            {"id": "expired", "coords": pentagon(), "base": 0, "top": 100,
             "validTimeFrom": 1_714_471_200, "validTimeTo": 1_714_474_800},
            {"id": "no-altitude", "coords": pentagon()}
        ]),
    );
    upstream.respond(
        "airsigmet",
        json!([
            {"id": "current", "coords": pentagon(), "airSigmetType": "AIRMET",
             "altitudeLow1": 0, "altitudeHi1": 120,
             "validTimeFrom": "2024-05-01T11:00:00Z", "validTimeTo": "2024-05-01T14:00:00Z"}
        ]),
    );
    let service = advisory_service(upstream);
    let state = FilterState {
        altitude: AltitudeRange {
            min: 0.0,
            max: 200.0,
        },
        ..Default::default()
    };

    let collection = service
        .feature_collection(BTreeMap::new(), &state, NOW)
        .await
        .expect("collection");

    let ids: Vec<&str> = collection.features.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["current"]);
}

#[tokio::test]
async fn upstream_failure_fails_the_whole_collection() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "isigmet",
        json!([{"id": "intl", "coords": pentagon(), "base": 0, "top": 300}]),
    );
    upstream.fail("airsigmet", 503);
    let service = advisory_service(upstream);

    let result = service
        .feature_collection(BTreeMap::new(), &FilterState::default(), NOW)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn repeated_collections_reuse_cached_feeds() {
    let upstream = StubUpstream::new();
    let service = advisory_service(upstream.clone());

    for _ in 0..3 {
        service
            .feature_collection(BTreeMap::new(), &FilterState::default(), NOW)
            .await
            .expect("collection");
    }

    assert_eq!(upstream.calls(), 2);
    assert_eq!(service.diagnostics().entries, 2);
}
