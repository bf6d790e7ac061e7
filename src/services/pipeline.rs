use crate::error::PipelineError;
use crate::models::{CacheSnapshot, CatalogEntry};
use crate::services::classifier::ContentClassifier;
use crate::services::dedup::dedupe;
use crate::services::m3u_parser::{parse_with_report, sort_channels, validate_document};

/// What the refresh path does with classified channels before caching them
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshPolicy {
    /// Drop excluded (VOD-looking) entries from the snapshot entirely
    pub channels_only: bool,
    /// Store channels sorted by group then name instead of playlist order
    pub sort_by_group: bool,
}

/// Turns fetched playlist text into a snapshot
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    classifier: ContentClassifier,
    policy: RefreshPolicy,
}

impl Pipeline {
    pub fn new(classifier: ContentClassifier, policy: RefreshPolicy) -> Self {
        Self { classifier, policy }
    }

    pub fn build_snapshot(&self, text: &str) -> Result<CacheSnapshot, PipelineError> {
        validate_document(text)?;

        let report = parse_with_report(text);
        let parsed = report.channels.len();
        if report.discarded_directives > 0 || report.orphan_resources > 0 {
            tracing::warn!(
                discarded_directives = report.discarded_directives,
                orphan_resources = report.orphan_resources,
                "Playlist contains malformed entries"
            );
        }

        let mut channels = dedupe(report.channels);
        let unique = channels.len();

        if self.policy.sort_by_group {
            sort_channels(&mut channels);
        }

        let entries: Vec<CatalogEntry> = channels
            .into_iter()
            .map(|channel| CatalogEntry {
                category: self.classifier.classify(&channel),
                excluded: self.classifier.exclude(&channel),
                channel,
            })
            .filter(|entry| !(self.policy.channels_only && entry.excluded))
            .collect();

        tracing::info!(
            parsed,
            duplicates_skipped = parsed - unique,
            kept = entries.len(),
            "Playlist processed"
        );

        Ok(CacheSnapshot::new(entries))
    }
}
