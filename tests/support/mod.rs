#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use hazard_atlas::{
    application::{
        advisories::AdvisoryService,
        proxy::{AdvisoryCache, AdvisoryProxy, UpstreamError, UpstreamTransport},
    },
    domain::advisory::RawRecord,
};
use serde_json::Value;
use url::Url;

pub const BASE_URL: &str = "https://upstream.test/api/data";

/// In-memory upstream keyed by the last path segment (`isigmet` / `airsigmet`).
#[derive(Default)]
pub struct StubUpstream {
    responses: Mutex<HashMap<String, Result<Value, u16>>>,
    calls: AtomicUsize,
}

impl StubUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, segment: &str, body: Value) {
        self.responses
            .lock()
            .expect("stub lock")
            .insert(segment.to_string(), Ok(body));
    }

    pub fn fail(&self, segment: &str, status: u16) {
        self.responses
            .lock()
            .expect("stub lock")
            .insert(segment.to_string(), Err(status));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamTransport for StubUpstream {
    async fn get_json(&self, url: &Url) -> Result<Vec<RawRecord>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let response = self
            .responses
            .lock()
            .expect("stub lock")
            .get(&segment)
            .cloned()
            .unwrap_or_else(|| Ok(Value::Array(Vec::new())));

        match response {
            Ok(body) => serde_json::from_value(body).map_err(UpstreamError::decode),
            Err(status) => Err(UpstreamError::status(status, "Stubbed Failure")),
        }
    }
}

pub fn advisory_service(upstream: Arc<StubUpstream>) -> Arc<AdvisoryService> {
    let base = Url::parse(BASE_URL).expect("valid base");
    let cache = Arc::new(AdvisoryCache::new(Duration::from_secs(3600)));
    let proxy = Arc::new(AdvisoryProxy::new(base, cache, upstream));
    Arc::new(AdvisoryService::new(proxy))
}
