use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Root endpoint - basic status and endpoint list
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "StreamLite Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": [
            "/api/channels?nameContains=&groupContains=&category=",
            "/api/channels/only",
            "/api/categories",
            "/api/categories/:category",
            "/api/refresh",
        ]
    }))
}

/// Snapshot summary for health reporting
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHealth {
    channels: usize,
    fetched_at: DateTime<Utc>,
    age_secs: u64,
    fresh: bool,
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    uptime: u64,
    ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<SnapshotHealth>,
}

/// GET /health - Cache health check
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();
    let fresh = state.cache.is_fresh();

    let snapshot = state.cache.snapshot().map(|s| SnapshotHealth {
        channels: s.len(),
        fetched_at: s.fetched_at,
        age_secs: s.age().as_secs(),
        fresh,
    });

    // stale data is still served, so only a missing snapshot is unhealthy
    let status = match &snapshot {
        Some(_) if fresh => "ok",
        Some(_) => "degraded",
        None => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        uptime,
        ttl_secs: state.config.cache_ttl_secs,
        refresh_interval_secs: state.config.refresh_interval_secs,
        snapshot,
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Readiness probe - ready once any snapshot can be served
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.cache.snapshot().is_some() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready - no playlist loaded")
    }
}

/// Liveness probe
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
