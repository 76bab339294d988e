//! Typed access to the elementary streams offered for one source.

mod descriptor;

pub use descriptor::{AudioQualityTier, MediaKind, StreamDescriptor, redact_locator};
use tracing::debug;

/// Stream descriptors for one source, partitioned by media kind.
///
/// Keeps the metadata source's ordering within each partition; the audio
/// fallback rule depends on it.
#[derive(Debug, Clone, Default)]
pub struct StreamCatalog {
    video: Vec<StreamDescriptor>,
    audio: Vec<StreamDescriptor>,
}

impl StreamCatalog {
    /// Builds a catalog from the raw descriptor list.
    ///
    /// Video descriptors without a quality label cannot be selected and are
    /// dropped here.
    pub fn new(descriptors: impl IntoIterator<Item = StreamDescriptor>) -> Self {
        let mut catalog = Self::default();
        for descriptor in descriptors {
            match descriptor.media_kind {
                MediaKind::VideoOnly if descriptor.quality_label.is_none() => {
                    debug!(
                        "Skipping unlabeled video stream {} from {}",
                        descriptor.format_id,
                        descriptor.locator_host()
                    );
                }
                MediaKind::VideoOnly => catalog.video.push(descriptor),
                MediaKind::AudioOnly => catalog.audio.push(descriptor),
            }
        }
        catalog
    }

    /// Video-only candidates in source order.
    pub fn video_only(&self) -> &[StreamDescriptor] {
        &self.video
    }

    /// Audio-only candidates in source order.
    pub fn audio_only(&self) -> &[StreamDescriptor] {
        &self.audio
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    pub fn len(&self) -> usize {
        self.video.len() + self.audio.len()
    }
}
