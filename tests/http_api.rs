mod support;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use hazard_atlas::infra::http::{HttpState, REQUEST_ID_HEADER, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use support::{StubUpstream, advisory_service};

fn router(upstream: std::sync::Arc<StubUpstream>) -> Router {
    build_router(HttpState {
        advisories: advisory_service(upstream),
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("body should be json");
    (status, body)
}

fn square() -> Value {
    json!([
        {"lon": 0.0, "lat": 0.0},
        {"lon": 1.0, "lat": 0.0},
        {"lon": 1.0, "lat": 1.0},
        {"lon": 0.0, "lat": 1.0}
    ])
}

#[tokio::test]
async fn health_reports_cache_occupancy() {
    let upstream = StubUpstream::new();
    let app = router(upstream);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "cache": {"entries": 0, "ttlSeconds": 3600}})
    );

    get(&app, "/api/isigmet").await;
    let (_, body) = get(&app, "/health").await;
    assert_eq!(body["cache"]["entries"], 1);
}

#[tokio::test]
async fn raw_feeds_are_passed_through_unchanged() {
    let upstream = StubUpstream::new();
    let records = json!([{"id": 7, "icaoId": "KKCI", "unknownField": {"nested": true}}]);
    upstream.respond("airsigmet", records.clone());
    let app = router(upstream.clone());

    let (status, body) = get(&app, "/api/airsigmet?hazard=turb").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, records);

    get(&app, "/api/airsigmet?hazard=turb").await;
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let upstream = StubUpstream::new();
    upstream.fail("isigmet", 500);
    let app = router(upstream);

    let (status, body) = get(&app, "/api/isigmet").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream responded 500 Stubbed Failure");

    let (status, _) = get(&app, "/api/features").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn features_endpoint_returns_filtered_geojson() {
    let upstream = StubUpstream::new();
    upstream.respond(
        "isigmet",
        json!([{"id": "intl", "coords": square(), "base": 0, "top": 300, "hazard": "TS"}]),
    );
    upstream.respond(
        "airsigmet",
        json!([
            {"id": "airmet", "coords": square(), "airSigmetType": "AIRMET", "altitudeHi1": 100},
            {"id": "gairmet", "coords": square(), "airSigmetType": "OUTLOOK", "altitudeHi1": 100}
        ]),
    );
    let app = router(upstream);

    let (status, body) = get(&app, "/api/features?showGAirmet=false&maxFL=250").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "FeatureCollection");

    let features = body["features"].as_array().expect("features array");
    let ids: Vec<&str> = features
        .iter()
        .map(|f| f["properties"]["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["intl", "airmet"]);

    let intl = &features[0];
    assert_eq!(intl["geometry"]["type"], "Polygon");
    assert_eq!(intl["geometry"]["coordinates"][0].as_array().map(Vec::len), Some(5));
    assert_eq!(intl["properties"]["type"], "SIGMET");
    assert_eq!(intl["properties"]["hazard"], "TS");
}

#[tokio::test]
async fn malformed_filter_is_a_bad_request() {
    let upstream = StubUpstream::new();
    let app = router(upstream.clone());

    let (status, body) = get(&app, "/api/features?minFL=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|msg| msg.contains("minFL")));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = router(StubUpstream::new());

    let (status, body) = get(&app, "/api/metar").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let upstream = StubUpstream::new();
    upstream.fail("isigmet", 500);
    let app = router(upstream);

    let generated = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/isigmet")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    assert_eq!(generated.status(), StatusCode::BAD_GATEWAY);
    let id = generated
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .expect("request id header");
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let echoed = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(&REQUEST_ID_HEADER, "client-7")
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("router should respond");
    assert_eq!(echoed.headers()[&REQUEST_ID_HEADER], "client-7");
}
