//! Periodic removal of stale cache entries.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::store::TtlCache;

/// Spawn a task that sweeps `cache` every `interval`.
///
/// The first tick fires one full interval after spawning. The task runs until the
/// returned handle is aborted.
pub fn spawn_sweeper<V>(cache: Arc<TtlCache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep();
            if removed > 0 {
                info!(
                    target = "hazard_atlas::cache::sweeper",
                    removed,
                    remaining = cache.len(),
                    "Swept stale cache entries"
                );
            } else {
                debug!(target = "hazard_atlas::cache::sweeper", "Cache sweep found nothing stale");
            }
        }
    })
}
