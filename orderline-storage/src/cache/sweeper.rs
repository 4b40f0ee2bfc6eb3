//! Background expiry sweep.
//!
//! The sweeper holds a `Weak` handle to the cache and exits on the first
//! tick after the last strong handle is dropped.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::order_cache::OrderCache;

/// Spawn the periodic expiry pass for `cache` on the current tokio runtime.
///
/// Returns `None` when the cache has no TTL or when called outside a runtime.
pub fn spawn_expiry_sweeper(cache: &Arc<OrderCache>) -> Option<JoinHandle<()>> {
    let period = cache.sweep_interval()?;

    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
            tracing::warn!("No tokio runtime; cache expiry relies on lazy checks only");
            return None;
        }
    };

    let weak = Arc::downgrade(cache);
    let mut ticker = {
        let _guard = runtime.enter();
        interval_at(Instant::now() + period, period)
    };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!(
        sweep_interval_ms = period.as_millis() as u64,
        "Cache expiry sweeper started"
    );

    Some(runtime.spawn(async move {
        loop {
            ticker.tick().await;

            let Some(cache) = weak.upgrade() else {
                break;
            };
            let removed = cache.purge_expired();
            drop(cache);

            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            } else {
                tracing::trace!("Cache sweep found no expired entries");
            }
        }
        tracing::debug!("Cache expiry sweeper stopped");
    }))
}
