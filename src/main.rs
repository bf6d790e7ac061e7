mod config;
mod error;
mod metrics;
mod models;
mod routes;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{
    channel_cache::ChannelCache,
    classifier::ContentClassifier,
    fetcher::HttpFetcher,
    pipeline::Pipeline,
    refresh_task::start_refresh_task,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub cache: ChannelCache,
    pub start_time: Instant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamlite_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting StreamLite Server v{}", env!("CARGO_PKG_VERSION"));
    if config.playlist_url.is_empty() {
        tracing::warn!("PLAYLIST_URL is not set; every refresh will fail");
    }

    let fetcher = HttpFetcher::new(
        &config.playlist_url,
        &config.user_agent,
        config.fetch_timeout(),
        config.max_retries,
        config.max_playlist_size_mb,
    )?;

    let pipeline = Pipeline::new(
        ContentClassifier::new(config.keyword_table()),
        config.refresh_policy(),
    );
    let cache = ChannelCache::new(Arc::new(fetcher), pipeline, config.cache_settings());
    tracing::info!(
        ttl_secs = config.cache_ttl_secs,
        channels_only = config.channels_only,
        "Channel cache initialized"
    );

    // Warm the cache in the background; requests arriving meanwhile join it
    if config.warm_on_start {
        let warm_cache = cache.clone();
        tokio::spawn(async move {
            if let Err(e) = warm_cache.get().await {
                tracing::warn!("Initial playlist load failed: {}", e);
            }
        });
    }

    if let Some(secs) = config.refresh_interval_secs {
        tokio::spawn(start_refresh_task(cache.clone(), Duration::from_secs(secs)));
        tracing::info!("Background refresh started (every {}s)", secs);
    }

    // Build application state
    let state = Arc::new(AppState {
        config,
        cache,
        start_time: Instant::now(),
    });

    let app = routes::build_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
