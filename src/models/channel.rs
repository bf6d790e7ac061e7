use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Content category, in classification precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Series,
    Sports,
    Live,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Series => "series",
            Category::Sports => "sports",
            Category::Live => "live",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the canonical labels plus the Portuguese route names
    /// (`filmes`, `esportes`, `canais`) older clients still call.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" | "filmes" => Ok(Category::Movie),
            "series" | "serie" | "séries" => Ok(Category::Series),
            "sports" | "sport" | "esportes" => Ok(Category::Sports),
            "live" | "live-channel" | "channels" | "canais" => Ok(Category::Live),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// A playable entry extracted from the playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub name: String,
    pub group: String,
    pub logo: Option<String>,
    pub url: String,
}

/// A channel together with the verdicts computed at refresh time
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub channel: Channel,
    pub category: Category,
    /// True when the channels-only view drops this entry
    pub excluded: bool,
}

/// Immutable result of one successful refresh.
///
/// Replaced wholesale by the cache; never mutated after construction, so the
/// timestamp always describes exactly the entries it was built with.
#[derive(Debug)]
pub struct CacheSnapshot {
    pub fetched_at: DateTime<Utc>,
    refreshed_at: Instant,
    entries: Vec<CatalogEntry>,
}

impl CacheSnapshot {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            fetched_at: Utc::now(),
            refreshed_at: Instant::now(),
            entries,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.entries.iter().map(|e| &e.channel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time elapsed since the upstream document was fetched
    pub fn age(&self) -> Duration {
        self.refreshed_at.elapsed()
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.category {
                Category::Movie => stats.movie_count += 1,
                Category::Series => stats.series_count += 1,
                Category::Sports => stats.sports_count += 1,
                Category::Live => stats.live_count += 1,
            }
            if entry.excluded {
                stats.excluded_count += 1;
            }
        }
        stats
    }
}

/// Per-category counts for a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub movie_count: usize,
    pub series_count: usize,
    pub sports_count: usize,
    pub live_count: usize,
    pub excluded_count: usize,
}

/// Snapshot channels split by category
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPartition {
    pub movie: Vec<Channel>,
    pub series: Vec<Channel>,
    pub sports: Vec<Channel>,
    pub live: Vec<Channel>,
    pub stats: CatalogStats,
}

/// Filters accepted by the query layer.
///
/// Unknown keys are ignored by serde's default behaviour; `category` stays a
/// raw string so an unrecognised value yields an empty result instead of a
/// rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQuery {
    #[serde(default)]
    pub name_contains: Option<String>,
    #[serde(default)]
    pub group_contains: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Channel list response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsResponse {
    pub success: bool,
    pub total: usize,
    pub last_update: DateTime<Utc>,
    pub channels: Vec<Channel>,
}

/// Refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub last_update: DateTime<Utc>,
    pub stats: CatalogStats,
}
