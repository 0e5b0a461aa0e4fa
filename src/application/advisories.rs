//! Fetch, normalize and filter advisories into a renderer-ready collection.

use std::{collections::BTreeMap, sync::Arc};

use time::OffsetDateTime;
use tracing::debug;

use crate::domain::{
    advisory::{AdvisoryKind, FeatureCollection, RawRecord},
    filter::{self, FilterState},
    normalize,
};

use super::proxy::{AdvisoryProxy, CacheDiagnostics, UpstreamError};

pub struct AdvisoryService {
    proxy: Arc<AdvisoryProxy>,
}

impl AdvisoryService {
    pub fn new(proxy: Arc<AdvisoryProxy>) -> Self {
        Self { proxy }
    }

    pub async fn intl_sigmets(
        &self,
        params: BTreeMap<String, String>,
    ) -> Result<Arc<Vec<RawRecord>>, UpstreamError> {
        self.proxy.fetch(AdvisoryKind::IntlSigmet, params).await
    }

    pub async fn air_sigmets(
        &self,
        params: BTreeMap<String, String>,
    ) -> Result<Arc<Vec<RawRecord>>, UpstreamError> {
        self.proxy.fetch(AdvisoryKind::AirSigmet, params).await
    }

    /// Both feeds, normalized and filtered. International SIGMETs come first.
    ///
    /// A failure on either feed fails the whole collection.
    pub async fn feature_collection(
        &self,
        params: BTreeMap<String, String>,
        state: &FilterState,
        now: OffsetDateTime,
    ) -> Result<FeatureCollection, UpstreamError> {
        let (intl, air) = tokio::try_join!(
            self.intl_sigmets(params.clone()),
            self.air_sigmets(params)
        )?;

        let mut features = normalize::normalize_intl_sigmets(&intl);
        features.extend(normalize::normalize_air_sigmets(&air));
        let normalized = features.len();

        let collection = filter::apply_collection(&features, state, now);
        debug!(
            target = "hazard_atlas::advisories",
            intl_records = intl.len(),
            air_records = air.len(),
            normalized,
            visible = collection.len(),
            "Built advisory feature collection"
        );
        Ok(collection)
    }

    pub fn diagnostics(&self) -> CacheDiagnostics {
        self.proxy.diagnostics()
    }
}
