//! In-memory key/value store with a fixed time-to-live per entry.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use metrics::{counter, gauge};
use tokio::time::Instant;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub const METRIC_CACHE_HIT: &str = "hazard_atlas_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "hazard_atlas_cache_miss_total";
pub const METRIC_CACHE_EXPIRED: &str = "hazard_atlas_cache_expired_total";
pub const METRIC_CACHE_SWEPT: &str = "hazard_atlas_cache_swept_total";
pub const METRIC_CACHE_ENTRIES: &str = "hazard_atlas_cache_entries";

/// A stored value and the instant it was written.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    stored_at: Instant,
    value: V,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// String-keyed cache whose entries expire `ttl` after they were last set.
///
/// Expiry is absolute: reading an entry never extends its life. Stale entries are
/// removed lazily when a `get` observes them, or in bulk by [`TtlCache::sweep`].
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the value stored under `key` if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                counter!(METRIC_CACHE_EXPIRED).increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
                None
            }
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry and restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            stored_at: Instant::now(),
            value,
        };
        let mut entries = mutex_lock(&self.entries, SOURCE, "set");
        entries.insert(key.into(), entry);
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
    }

    /// Number of stored entries, including stale ones not yet evicted.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    /// Remove every entry whose age has reached the TTL. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "sweep");
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        let removed = before - entries.len();

        counter!(METRIC_CACHE_SWEPT).increment(removed as u64);
        gauge!(METRIC_CACHE_ENTRIES).set(entries.len() as f64);
        removed
    }
}
