//! Resolver returning preconfigured metadata, for development and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{MetadataError, MetadataResolver, SourceMetadata, validate_source};
use crate::catalog::{AudioQualityTier, StreamDescriptor};

/// Resolver that answers every valid source with the same metadata.
pub struct FixtureResolver {
    outcome: Result<SourceMetadata, String>,
    calls: AtomicUsize,
}

impl FixtureResolver {
    pub fn new(metadata: SourceMetadata) -> Self {
        Self {
            outcome: Ok(metadata),
            calls: AtomicUsize::new(0),
        }
    }

    /// Resolver whose every call fails as if the backend rejected the source.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Demo catalog served in development mode.
    pub fn demo() -> Self {
        let base = "https://media.tubemux.local/demo";
        Self::new(SourceMetadata::new(
            "Tubemux Demo: Big Buck Bunny",
            vec![
                StreamDescriptor::video(format!("{base}/v360.mp4"), "360p")
                    .with_format_id("134")
                    .with_frame_rate(30)
                    .with_bitrate(650_000)
                    .with_dimensions(640, 360)
                    .with_codec("avc1.4d401e")
                    .with_container("mp4"),
                StreamDescriptor::video(format!("{base}/v720.mp4"), "720p")
                    .with_format_id("136")
                    .with_frame_rate(30)
                    .with_bitrate(1_500_000)
                    .with_dimensions(1280, 720)
                    .with_codec("avc1.4d401f")
                    .with_container("mp4"),
                StreamDescriptor::video(format!("{base}/v720p60.mp4"), "720p")
                    .with_format_id("298")
                    .with_frame_rate(60)
                    .with_bitrate(2_600_000)
                    .with_dimensions(1280, 720)
                    .with_codec("avc1.4d4020")
                    .with_container("mp4"),
                StreamDescriptor::video(format!("{base}/v1080.webm"), "1080p")
                    .with_format_id("248")
                    .with_frame_rate(30)
                    .with_bitrate(2_900_000)
                    .with_dimensions(1920, 1080)
                    .with_codec("vp9")
                    .with_container("webm"),
                StreamDescriptor::audio(format!("{base}/a140.m4a"))
                    .with_format_id("140")
                    .with_tier(AudioQualityTier::Medium)
                    .with_codec("mp4a.40.2")
                    .with_audio_bitrate(129_000)
                    .with_sample_rate(44_100)
                    .with_channels(2)
                    .with_container("m4a"),
                StreamDescriptor::audio(format!("{base}/a251.webm"))
                    .with_format_id("251")
                    .with_tier(AudioQualityTier::Medium)
                    .with_codec("opus")
                    .with_audio_bitrate(135_000)
                    .with_sample_rate(48_000)
                    .with_channels(2)
                    .with_container("webm"),
            ],
        ))
    }

    /// Number of `resolve` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataResolver for FixtureResolver {
    async fn resolve(&self, source: &str) -> Result<SourceMetadata, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        validate_source(source)?;

        match &self.outcome {
            Ok(metadata) => Ok(metadata.clone()),
            Err(reason) => Err(MetadataError::ResolverFailed {
                status: "fixture".to_string(),
                stderr: reason.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
