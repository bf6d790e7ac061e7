//! Periodic playlist refresh, independent of request traffic.
//!
//! Goes through `ChannelCache::force_refresh`, so a scheduled refresh joins any
//! refresh already running instead of issuing a second upstream fetch.

use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::services::channel_cache::ChannelCache;

/// Run one scheduled refresh and log the outcome
pub async fn run_refresh(cache: &ChannelCache) {
    match cache.force_refresh().await {
        Ok(snapshot) => tracing::info!(
            channels = snapshot.len(),
            fetched_at = %snapshot.fetched_at,
            "Scheduled refresh complete"
        ),
        Err(e) => tracing::warn!("Scheduled refresh failed: {}", e),
    }
}

/// Start the background refresh loop.
///
/// The first refresh happens one interval after start; warming the cache at
/// startup is the caller's job. Spawn with `tokio::spawn`.
pub async fn start_refresh_task(cache: ChannelCache, interval: Duration) {
    tracing::info!("Starting refresh task (interval: {}s)", interval.as_secs());

    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_refresh(&cache).await;
    }
}
