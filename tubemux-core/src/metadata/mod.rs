//! Source metadata resolution.
//!
//! A resolver turns a user-supplied source reference into a title and the
//! list of elementary streams the source publishes. Resolvers are handed to
//! request handlers explicitly; nothing here caches across requests.

mod fixture;
mod ytdlp;

use async_trait::async_trait;
pub use fixture::FixtureResolver;
use thiserror::Error;
pub use ytdlp::YtDlpResolver;

use crate::catalog::{StreamCatalog, StreamDescriptor};

/// Title and stream candidates for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMetadata {
    pub title: String,
    pub streams: Vec<StreamDescriptor>,
}

impl SourceMetadata {
    pub fn new(title: impl Into<String>, streams: Vec<StreamDescriptor>) -> Self {
        Self {
            title: title.into(),
            streams,
        }
    }

    /// Partitions the streams into a catalog.
    pub fn catalog(&self) -> StreamCatalog {
        StreamCatalog::new(self.streams.iter().cloned())
    }
}

/// Resolves source references into stream metadata.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolves `source` into its title and elementary streams.
    ///
    /// # Errors
    ///
    /// - `MetadataError::InvalidSource` - Reference is empty or malformed
    /// - `MetadataError::ResolverUnavailable` - Resolver backend cannot be started
    /// - `MetadataError::ResolverFailed` - Backend rejected the source
    /// - `MetadataError::Timeout` - Backend did not answer in time
    /// - `MetadataError::Parse` - Backend output could not be understood
    async fn resolve(&self, source: &str) -> Result<SourceMetadata, MetadataError>;

    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;
}

/// Errors that can occur while resolving source metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Source reference is empty or not a URL.
    #[error("Invalid source reference: {reason}")]
    InvalidSource { reason: String },

    /// Resolver executable could not be spawned.
    #[error("Metadata resolver unavailable: {reason}")]
    ResolverUnavailable { reason: String },

    /// Resolver ran but reported failure.
    #[error("Metadata resolver failed with {status}: {stderr}")]
    ResolverFailed { status: String, stderr: String },

    /// Resolver did not finish within the configured timeout.
    #[error("Metadata resolution timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Resolver output was not valid metadata.
    #[error("Failed to parse metadata: {reason}")]
    Parse { reason: String },
}

/// Rejects references that are empty or are not absolute URLs.
pub(crate) fn validate_source(source: &str) -> Result<url::Url, MetadataError> {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return Err(MetadataError::InvalidSource {
            reason: "source reference is empty".to_string(),
        });
    }

    url::Url::parse(trimmed).map_err(|e| MetadataError::InvalidSource {
        reason: format!("{e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_source() {
        assert!(validate_source("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(matches!(
            validate_source("   "),
            Err(MetadataError::InvalidSource { .. })
        ));
        assert!(matches!(
            validate_source("watch?v=abc"),
            Err(MetadataError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_metadata_catalog() {
        let metadata = SourceMetadata::new(
            "clip",
            vec![
                StreamDescriptor::video("v", "720p"),
                StreamDescriptor::audio("a"),
            ],
        );
        let catalog = metadata.catalog();
        assert_eq!(catalog.video_only().len(), 1);
        assert_eq!(catalog.audio_only().len(), 1);
    }
}
