//! Tubemux Core - stream selection and streaming remux pipeline
//!
//! This crate turns a list of independent video-only and audio-only
//! elementary streams into a single progressively delivered fragmented MP4:
//! it picks the best candidates, drives the remux subprocess and exposes its
//! output as a live byte stream.

pub mod catalog;
pub mod config;
pub mod delivery;
pub mod metadata;
pub mod mode;
pub mod remux;
pub mod request;
pub mod selection;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{AudioQualityTier, MediaKind, StreamCatalog, StreamDescriptor};
pub use config::TubemuxConfig;
pub use metadata::{MetadataError, MetadataResolver, SourceMetadata};
pub use mode::RuntimeMode;
pub use remux::{RemuxError, RemuxOrchestrator, RemuxStream, Remuxer};
pub use request::{DownloadPlan, SelectionError};

/// Core errors that can bubble up from any Tubemux subsystem.
///
/// High-level error types representing failures in core functionality.
#[derive(Debug, thiserror::Error)]
pub enum TubemuxError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Remux error: {0}")]
    Remux(#[from] RemuxError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TubemuxError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TubemuxError::Metadata(e) => match e {
                MetadataError::InvalidSource { reason } => format!("Invalid source: {reason}"),
                MetadataError::ResolverUnavailable { .. } => {
                    "Metadata resolver is not installed".to_string()
                }
                _ => "Failed to fetch video info".to_string(),
            },
            TubemuxError::Selection(e) => e.to_string(),
            TubemuxError::Remux(RemuxError::SourceRejected { .. }) => {
                "Source stream rejected the request, its link may have expired".to_string()
            }
            TubemuxError::Remux(_) => "Media conversion failed".to_string(),
            TubemuxError::Configuration { .. } => "Configuration error occurred".to_string(),
            TubemuxError::Io(_) => "I/O error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            TubemuxError::Selection(_)
                | TubemuxError::Metadata(MetadataError::InvalidSource { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, TubemuxError>;
