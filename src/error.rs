//! Error types for the refresh pipeline
//!
//! Only document-level and fetch-level failures are errors. Parsing,
//! classification and querying degrade through defaults instead.

use std::time::Duration;
use thiserror::Error;

/// Failure of a cache refresh or of a read that needed one.
///
/// `Clone` so that one in-flight refresh can hand the same outcome to every
/// caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Fetched text carries neither `#EXTM3U` nor `#EXTINF`
    #[error("Invalid playlist document (missing #EXTM3U/#EXTINF marker)")]
    MalformedDocument,

    /// Network error or non-success response from upstream
    #[error("Failed to fetch playlist: {0}")]
    Fetch(String),

    /// Upstream did not answer within the configured timeout
    #[error("Playlist fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Nothing has ever been cached and the refresh just failed too
    #[error("No cached playlist available: {source}")]
    EmptyCache {
        #[source]
        source: Box<PipelineError>,
    },

    /// The refresh task died before producing a result
    #[error("Refresh task failed: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn empty_cache(source: PipelineError) -> Self {
        PipelineError::EmptyCache {
            source: Box::new(source),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Fetch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_keeps_cause() {
        let err = PipelineError::empty_cache(PipelineError::MalformedDocument);
        assert!(err.to_string().contains("missing #EXTM3U"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source, Some(PipelineError::MalformedDocument.to_string()));
    }
}
