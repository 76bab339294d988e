//! Stream selection: best audio, per-quality best video.
//!
//! All functions here are pure and operate on borrowed descriptor slices,
//! so running them twice over the same catalog always yields the same
//! answer.

pub mod audio;
pub mod quality;
pub mod video;

pub use audio::select_best_audio;
pub use quality::{CANONICAL_QUALITIES, DEFAULT_QUALITY, canonical_label, canonical_rank};
pub use video::{select_best_video, unique_qualities};

use crate::catalog::{StreamCatalog, StreamDescriptor};

/// Best candidates for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    audio: Option<StreamDescriptor>,
    videos: Vec<(&'static str, StreamDescriptor)>,
}

impl SelectionResult {
    /// Runs both selectors over `catalog`.
    pub fn from_catalog(catalog: &StreamCatalog) -> Self {
        let audio = select_best_audio(catalog.audio_only()).cloned();

        let videos = unique_qualities(catalog.video_only())
            .into_iter()
            .filter_map(|label| {
                select_best_video(catalog.video_only(), label)
                    .map(|descriptor| (label, descriptor.clone()))
            })
            .collect();

        Self { audio, videos }
    }

    pub fn audio(&self) -> Option<&StreamDescriptor> {
        self.audio.as_ref()
    }

    /// `(label, best video)` pairs in canonical ascending order.
    pub fn videos(&self) -> &[(&'static str, StreamDescriptor)] {
        &self.videos
    }

    /// Best video for `label`, if that quality is available.
    pub fn video_for(&self, label: &str) -> Option<&StreamDescriptor> {
        self.videos
            .iter()
            .find(|(candidate, _)| *candidate == label)
            .map(|(_, descriptor)| descriptor)
    }

    /// Lowest available quality and its best video.
    pub fn first_video(&self) -> Option<(&'static str, &StreamDescriptor)> {
        self.videos
            .first()
            .map(|(label, descriptor)| (*label, descriptor))
    }

    pub fn available_qualities(&self) -> Vec<&'static str> {
        self.videos.iter().map(|(label, _)| *label).collect()
    }
}
