//! Prometheus metrics for the refresh pipeline, exported on `/metrics`

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static! {
    pub static ref UPSTREAM_FETCHES: IntCounter = register_int_counter!(
        "streamlite_upstream_fetches_total",
        "Playlist fetches issued to the upstream server"
    )
    .unwrap();
    pub static ref REFRESH_SUCCESS: IntCounter = register_int_counter!(
        "streamlite_refresh_success_total",
        "Refreshes that installed a new snapshot"
    )
    .unwrap();
    pub static ref REFRESH_FAILURES: IntCounter = register_int_counter!(
        "streamlite_refresh_failures_total",
        "Refreshes that failed to fetch or parse the playlist"
    )
    .unwrap();
    pub static ref STALE_FALLBACKS: IntCounter = register_int_counter!(
        "streamlite_stale_fallbacks_total",
        "Reads served from a previous snapshot after a failed refresh"
    )
    .unwrap();
    pub static ref SNAPSHOT_CHANNELS: IntGauge = register_int_gauge!(
        "streamlite_snapshot_channels",
        "Channels in the current snapshot"
    )
    .unwrap();
}
