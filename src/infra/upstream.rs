//! HTTP transport to the upstream advisory provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{
    application::proxy::{UpstreamError, UpstreamTransport},
    domain::advisory::RawRecord,
};

use super::error::InfraError;

#[derive(Clone, Debug)]
pub struct AwcTransport {
    client: Client,
}

impl AwcTransport {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build upstream client: {err}")))?;
        Ok(Self { client })
    }

    pub fn user_agent() -> &'static str {
        concat!("hazard-atlas/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl UpstreamTransport for AwcTransport {
    async fn get_json(&self, url: &Url) -> Result<Vec<RawRecord>, UpstreamError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(UpstreamError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let bytes = resp.bytes().await.map_err(UpstreamError::transport)?;
        serde_json::from_slice(&bytes).map_err(UpstreamError::decode)
    }
}
