//! Cache key construction for upstream advisory requests.

use std::collections::BTreeMap;

use url::Url;

use crate::domain::advisory::AdvisoryKind;

const FORMAT_PARAM: &str = "format";
const DEFAULT_FORMAT: &str = "json";

/// One upstream request: which feed, and the caller's query parameters.
///
/// Parameters live in a `BTreeMap`, so the URL (and therefore the cache key) is the same
/// regardless of the order the caller supplied them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryRequest {
    pub kind: AdvisoryKind,
    pub query_params: BTreeMap<String, String>,
}

impl AdvisoryRequest {
    pub fn new(kind: AdvisoryKind, query_params: BTreeMap<String, String>) -> Self {
        Self { kind, query_params }
    }

    /// Fully-qualified upstream URL: `<base>/<kind>?format=json&...`, keys sorted,
    /// caller values winning over the default `format`.
    pub fn upstream_url(&self, base: &Url) -> Url {
        let mut params: BTreeMap<&str, &str> = BTreeMap::new();
        params.insert(FORMAT_PARAM, DEFAULT_FORMAT);
        for (key, value) in &self.query_params {
            params.insert(key, value);
        }

        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(self.kind.path_segment());
        }
        url.query_pairs_mut().clear().extend_pairs(params);
        url
    }

    pub fn cache_key(&self, base: &Url) -> String {
        self.upstream_url(base).into()
    }
}
