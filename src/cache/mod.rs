//! Advisory cache: a TTL store keyed by upstream URL, plus its background sweeper.

mod config;
mod keys;
mod lock;
mod store;
mod sweeper;

pub use config::CacheConfig;
pub use keys::AdvisoryRequest;
pub use store::{
    METRIC_CACHE_ENTRIES, METRIC_CACHE_EXPIRED, METRIC_CACHE_HIT, METRIC_CACHE_MISS,
    METRIC_CACHE_SWEPT, TtlCache,
};
pub use sweeper::spawn_sweeper;
