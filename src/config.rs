use std::env;
use std::time::Duration;

use crate::models::Category;
use crate::services::channel_cache::CacheSettings;
use crate::services::classifier::KeywordTable;
use crate::services::pipeline::RefreshPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Upstream
    pub playlist_url: String,
    pub fetch_timeout_ms: u64,
    pub max_retries: u32,
    pub max_playlist_size_mb: usize,
    pub user_agent: String,

    // Cache
    pub cache_ttl_secs: u64,
    pub refresh_interval_secs: Option<u64>,
    pub warm_on_start: bool,

    // Pipeline
    pub channels_only: bool,
    pub sort_by_group: bool,
    pub movie_keywords: Option<Vec<String>>,
    pub series_keywords: Option<Vec<String>>,
    pub sports_keywords: Option<Vec<String>>,
    pub exclude_keywords: Option<Vec<String>>,
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn bool_var(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Comma-separated list; unset or blank means "keep the defaults"
fn list_var(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().and_then(|v| parse_keyword_list(&v))
}

fn parse_keyword_list(raw: &str) -> Option<Vec<String>> {
    let words: Vec<String> = raw
        .split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words)
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: parse_var("PORT", 3001),

            // Upstream
            playlist_url: env::var("PLAYLIST_URL").unwrap_or_default(),
            fetch_timeout_ms: parse_var("FETCH_TIMEOUT_MS", 30_000), // 30 seconds
            max_retries: parse_var("MAX_RETRIES", 2),
            max_playlist_size_mb: parse_var("MAX_PLAYLIST_SIZE_MB", 200),
            // Use VLC user agent to avoid IPTV server blocks
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),

            // Cache
            cache_ttl_secs: parse_var("CACHE_TTL_SECS", 86_400), // 24 hours
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .filter(|secs: &u64| *secs > 0),
            warm_on_start: bool_var("WARM_ON_START", true),

            // Pipeline
            channels_only: bool_var("CHANNELS_ONLY", false),
            sort_by_group: bool_var("SORT_BY_GROUP", false),
            movie_keywords: list_var("MOVIE_KEYWORDS"),
            series_keywords: list_var("SERIES_KEYWORDS"),
            sports_keywords: list_var("SPORTS_KEYWORDS"),
            exclude_keywords: list_var("EXCLUDE_KEYWORDS"),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            fetch_timeout: self.fetch_timeout(),
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            channels_only: self.channels_only,
            sort_by_group: self.sort_by_group,
        }
    }

    /// Default keyword table with any configured overrides applied
    pub fn keyword_table(&self) -> KeywordTable {
        let mut table = KeywordTable::default();
        let overrides = [
            (Category::Movie, &self.movie_keywords),
            (Category::Series, &self.series_keywords),
            (Category::Sports, &self.sports_keywords),
        ];
        for (category, keywords) in overrides {
            if let Some(keywords) = keywords {
                table = table.with_keywords(category, keywords.clone());
            }
        }
        if let Some(exclusions) = &self.exclude_keywords {
            table = table.with_exclusions(exclusions.clone());
        }
        table
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
