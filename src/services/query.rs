use crate::models::{CacheSnapshot, Category, CategoryPartition, Channel, ChannelQuery};

/// Filter snapshot channels; every supplied filter must match.
///
/// Name and group filters are case-insensitive substring matches; category is
/// exact. With no filters the whole snapshot comes back in stored order. A
/// category value naming no known category matches nothing.
pub fn query(snapshot: &CacheSnapshot, filters: &ChannelQuery) -> Vec<Channel> {
    let name_needle = needle(filters.name_contains.as_deref());
    let group_needle = needle(filters.group_contains.as_deref());
    let category = match filters.category.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<Category>() {
            Ok(category) => Some(category),
            Err(_) => return Vec::new(),
        },
    };

    snapshot
        .entries()
        .iter()
        .filter(|entry| category.map_or(true, |c| entry.category == c))
        .filter(|entry| {
            name_needle
                .as_deref()
                .map_or(true, |n| entry.channel.name.to_lowercase().contains(n))
        })
        .filter(|entry| {
            group_needle
                .as_deref()
                .map_or(true, |g| entry.channel.group.to_lowercase().contains(g))
        })
        .map(|entry| entry.channel.clone())
        .collect()
}

/// Channels that survive the exclusion filter, in stored order
pub fn channels_only(snapshot: &CacheSnapshot) -> Vec<Channel> {
    snapshot
        .entries()
        .iter()
        .filter(|entry| !entry.excluded)
        .map(|entry| entry.channel.clone())
        .collect()
}

/// All channels split by category, with counts
pub fn partition(snapshot: &CacheSnapshot) -> CategoryPartition {
    let mut out = CategoryPartition {
        stats: snapshot.stats(),
        ..Default::default()
    };

    for entry in snapshot.entries() {
        let bucket = match entry.category {
            Category::Movie => &mut out.movie,
            Category::Series => &mut out.series,
            Category::Sports => &mut out.sports,
            Category::Live => &mut out.live,
        };
        bucket.push(entry.channel.clone());
    }

    out
}

fn needle(raw: Option<&str>) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}
