//! Request id propagation and per-request logging for the advisory routes.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{application::error::ErrorReport, domain::advisory::AdvisoryKind};

use super::public::route_feeds;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse a sane caller-supplied id, otherwise mint a fresh one.
    fn from_request(request: &Request<Body>) -> Self {
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { request_id }
    }
}

/// Attach a [`RequestContext`] to the request and echo its id on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    let header = HeaderValue::from_str(&ctx.request_id).ok();
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let route = route.as_deref().unwrap_or("unmatched");
    let feeds = feed_label(route_feeds(route));

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "hazard_atlas::http::response",
            status = status.as_u16(),
            method = %method,
            route = route,
            feeds = %feeds,
            elapsed_ms = elapsed_ms,
            request_id = request_id,
            "request served",
        );
        return response;
    }

    let report = response.extensions_mut().remove::<ErrorReport>();
    let (source, messages) = match report {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());

    if status.is_server_error() {
        error!(
            target = "hazard_atlas::http::response",
            status = status.as_u16(),
            method = %method,
            route = route,
            feeds = %feeds,
            query = uri.query().unwrap_or(""),
            elapsed_ms = elapsed_ms,
            source = source,
            detail = %detail,
            chain = ?messages,
            request_id = request_id,
            "advisory request failed",
        );
    } else {
        warn!(
            target = "hazard_atlas::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            route = route,
            query = uri.query().unwrap_or(""),
            detail = %detail,
            request_id = request_id,
            "rejected advisory request",
        );
    }

    response
}

fn feed_label(kinds: &[AdvisoryKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.path_segment())
        .collect::<Vec<_>>()
        .join(",")
}
