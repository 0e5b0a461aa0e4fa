//! Cached access to the upstream advisory feeds.

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    cache::{AdvisoryRequest, TtlCache},
    domain::advisory::{AdvisoryKind, RawRecord},
};

pub const METRIC_UPSTREAM_REQUEST_MS: &str = "hazard_atlas_upstream_request_ms";
pub const METRIC_UPSTREAM_FAILURE: &str = "hazard_atlas_upstream_failure_total";

/// Raw advisory arrays as they are cached and shared between requests.
pub type AdvisoryCache = TtlCache<Arc<Vec<RawRecord>>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream responded {status} {status_text}")]
    Status { status: u16, status_text: String },
    #[error("upstream request failed: {cause}")]
    Transport { cause: String },
    #[error("upstream payload could not be decoded: {cause}")]
    Decode { cause: String },
}

impl UpstreamError {
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::Status {
            status,
            status_text: status_text.into(),
        }
    }

    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport {
            cause: cause.to_string(),
        }
    }

    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            cause: cause.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Status { .. } => "status",
            UpstreamError::Transport { .. } => "transport",
            UpstreamError::Decode { .. } => "decode",
        }
    }
}

/// Performs one GET against the upstream provider and decodes a JSON array of objects.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Vec<RawRecord>, UpstreamError>;
}

/// Cache occupancy reported on the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDiagnostics {
    pub entries: usize,
    pub ttl_seconds: u64,
}

pub struct AdvisoryProxy {
    base: Url,
    cache: Arc<AdvisoryCache>,
    transport: Arc<dyn UpstreamTransport>,
}

impl AdvisoryProxy {
    pub fn new(base: Url, cache: Arc<AdvisoryCache>, transport: Arc<dyn UpstreamTransport>) -> Self {
        Self {
            base,
            cache,
            transport,
        }
    }

    /// Return the advisories for `kind`, from cache when fresh, otherwise from upstream.
    ///
    /// Failed upstream calls are never cached. Concurrent misses on the same key may each
    /// reach upstream; the last successful write wins.
    pub async fn fetch(
        &self,
        kind: AdvisoryKind,
        query_params: BTreeMap<String, String>,
    ) -> Result<Arc<Vec<RawRecord>>, UpstreamError> {
        let request = AdvisoryRequest::new(kind, query_params);
        let url = request.upstream_url(&self.base);
        let key = url.as_str();

        if let Some(cached) = self.cache.get(key) {
            debug!(
                target = "hazard_atlas::proxy",
                kind = %kind,
                url = key,
                records = cached.len(),
                "Serving advisories from cache"
            );
            return Ok(cached);
        }

        info!(
            target = "hazard_atlas::proxy",
            kind = %kind,
            url = key,
            "Cache miss, fetching advisories upstream"
        );

        let started = Instant::now();
        let result = self.transport.get_json(&url).await;
        histogram!(METRIC_UPSTREAM_REQUEST_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(records) => {
                let records = Arc::new(records);
                self.cache.set(key, records.clone());
                info!(
                    target = "hazard_atlas::proxy",
                    kind = %kind,
                    url = key,
                    records = records.len(),
                    "Stored upstream advisories"
                );
                Ok(records)
            }
            Err(err) => {
                counter!(METRIC_UPSTREAM_FAILURE, "kind" => err.kind()).increment(1);
                warn!(
                    target = "hazard_atlas::proxy",
                    kind = %kind,
                    url = key,
                    error = %err,
                    "Upstream advisory fetch failed"
                );
                Err(err)
            }
        }
    }

    pub fn diagnostics(&self) -> CacheDiagnostics {
        CacheDiagnostics {
            entries: self.cache.len(),
            ttl_seconds: self.cache.ttl().as_secs(),
        }
    }
}
