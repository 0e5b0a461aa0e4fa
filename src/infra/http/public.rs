use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    application::{advisories::AdvisoryService, error::AppError},
    domain::{
        advisory::AdvisoryKind,
        filter::{FilterState, parse_finite},
    },
};

use super::middleware::{log_responses, set_request_context};

const INTL_SIGMET_ROUTE: &str = "/api/isigmet";
const AIR_SIGMET_ROUTE: &str = "/api/airsigmet";
const FEATURES_ROUTE: &str = "/api/features";
const HEALTH_ROUTE: &str = "/health";

const SHOW_SIGMET: &str = "showSigmet";
const SHOW_AIRMET: &str = "showAirmet";
const SHOW_G_AIRMET: &str = "showGAirmet";
const MIN_FL: &str = "minFL";
const MAX_FL: &str = "maxFL";
const FROM_OFFSET_HOURS: &str = "fromOffsetHours";
const TO_OFFSET_HOURS: &str = "toOffsetHours";

#[derive(Clone)]
pub struct HttpState {
    pub advisories: Arc<AdvisoryService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route(INTL_SIGMET_ROUTE, get(intl_sigmets))
        .route(AIR_SIGMET_ROUTE, get(air_sigmets))
        .route(FEATURES_ROUTE, get(features))
        .route(HEALTH_ROUTE, get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Upstream feeds a matched route reads from.
pub(super) fn route_feeds(route: &str) -> &'static [AdvisoryKind] {
    match route {
        INTL_SIGMET_ROUTE => &[AdvisoryKind::IntlSigmet],
        AIR_SIGMET_ROUTE => &[AdvisoryKind::AirSigmet],
        FEATURES_ROUTE => &[AdvisoryKind::IntlSigmet, AdvisoryKind::AirSigmet],
        _ => &[],
    }
}

async fn intl_sigmets(
    State(state): State<HttpState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let records = state.advisories.intl_sigmets(params).await?;
    Ok(Json(records.as_slice()).into_response())
}

async fn air_sigmets(
    State(state): State<HttpState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let records = state.advisories.air_sigmets(params).await?;
    Ok(Json(records.as_slice()).into_response())
}

async fn features(
    State(state): State<HttpState>,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> Result<Response, AppError> {
    let filter = filter_from_params(&mut params)?;
    let collection = state
        .advisories
        .feature_collection(params, &filter, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(collection).into_response())
}

async fn health(State(state): State<HttpState>) -> Response {
    Json(json!({
        "status": "ok",
        "cache": state.advisories.diagnostics(),
    }))
    .into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

/// Take the presentation filter out of a query string, leaving every other parameter
/// to be forwarded upstream. The resulting state is sanitized.
pub fn filter_from_params(params: &mut BTreeMap<String, String>) -> Result<FilterState, AppError> {
    let mut state = FilterState::default();

    if let Some(value) = take_parsed(params, SHOW_SIGMET, parse_flag)? {
        state.categories.sigmet = value;
    }
    if let Some(value) = take_parsed(params, SHOW_AIRMET, parse_flag)? {
        state.categories.airmet = value;
    }
    if let Some(value) = take_parsed(params, SHOW_G_AIRMET, parse_flag)? {
        state.categories.g_airmet = value;
    }
    if let Some(value) = take_parsed(params, MIN_FL, parse_finite)? {
        state.altitude.min = value;
    }
    if let Some(value) = take_parsed(params, MAX_FL, parse_finite)? {
        state.altitude.max = value;
    }
    if let Some(value) = take_parsed(params, FROM_OFFSET_HOURS, parse_finite)? {
        state.time.from_offset_hours = value;
    }
    if let Some(value) = take_parsed(params, TO_OFFSET_HOURS, parse_finite)? {
        state.time.to_offset_hours = value;
    }

    Ok(state.sanitized())
}

fn take_parsed<T>(
    params: &mut BTreeMap<String, String>,
    key: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, AppError> {
    match params.remove(key) {
        None => Ok(None),
        Some(raw) => parse(raw.trim())
            .map(Some)
            .ok_or_else(|| AppError::validation(format!("invalid value `{raw}` for `{key}`"))),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
