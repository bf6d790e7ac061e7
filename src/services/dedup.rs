use std::collections::HashSet;

use crate::models::Channel;

/// Drop repeated stream URLs, keeping the first occurrence.
///
/// The key is `url` byte for byte: no scheme, trailing-slash or query
/// normalization. Channels with an empty url are dropped since they cannot
/// be served.
pub fn dedupe(channels: Vec<Channel>) -> Vec<Channel> {
    let mut seen_urls: HashSet<String> = HashSet::with_capacity(channels.len());
    let mut duplicates_skipped = 0usize;

    let unique: Vec<Channel> = channels
        .into_iter()
        .filter(|channel| {
            if channel.url.is_empty() {
                return false;
            }
            if seen_urls.insert(channel.url.clone()) {
                true
            } else {
                duplicates_skipped += 1;
                false
            }
        })
        .collect();

    if duplicates_skipped > 0 {
        tracing::debug!(duplicates_skipped, kept = unique.len(), "Duplicate URLs removed");
    }

    unique
}
