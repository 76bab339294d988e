//! Request planning: from resolved metadata and an optional quality label to
//! either an informational report or a concrete pair to remux.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::StreamDescriptor;
use crate::config::SelectionConfig;
use crate::metadata::SourceMetadata;
use crate::selection::SelectionResult;

/// How a download request without a usable quality label is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPolicy {
    /// Report available qualities when none is named, reject unknown ones.
    #[default]
    Report,
    /// Use the default quality when none is named, the lowest available
    /// quality when the named one is missing.
    FallbackToFirst,
}

impl std::fmt::Display for QualityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityPolicy::Report => write!(f, "report"),
            QualityPolicy::FallbackToFirst => write!(f, "fallback"),
        }
    }
}

impl FromStr for QualityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" | "strict" => Ok(QualityPolicy::Report),
            "fallback" | "fallback-to-first" | "first" => Ok(QualityPolicy::FallbackToFirst),
            _ => Err(format!("Invalid quality policy: {s}")),
        }
    }
}

/// Reasons a request cannot be turned into a remux job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Quality selection is required")]
    QualityRequired,

    #[error(
        "Quality {requested} is not available. Available qualities: {}",
        if available.is_empty() { "none".to_string() } else { available.join(", ") }
    )]
    QualityUnavailable {
        requested: String,
        available: Vec<String>,
    },

    #[error("No video streams available for this source")]
    NoVideo,

    #[error("No audio stream available for this source")]
    NoAudio,
}

/// Info-mode entry for one available quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityInfo {
    pub quality: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub container: Option<String>,
}

/// Best audio's effective bitrate, or `"unknown"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AudioQuality {
    Bitrate(u64),
    Unknown(&'static str),
}

/// Informational answer listing every available quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub title: String,
    pub available_qualities: Vec<QualityInfo>,
    pub audio_quality: AudioQuality,
}

impl SourceInfo {
    pub fn from_selection(title: &str, selection: &SelectionResult) -> Self {
        let available_qualities = selection
            .videos()
            .iter()
            .map(|(label, video)| QualityInfo {
                quality: (*label).to_string(),
                width: video.width,
                height: video.height,
                fps: video.frame_rate,
                container: video.container.clone(),
            })
            .collect();

        let audio_quality = match selection.audio().map(StreamDescriptor::effective_audio_bitrate) {
            Some(bitrate) if bitrate > 0 => AudioQuality::Bitrate(bitrate),
            _ => AudioQuality::Unknown("unknown"),
        };

        Self {
            title: title.to_string(),
            available_qualities,
            audio_quality,
        }
    }

    pub fn quality_labels(&self) -> Vec<String> {
        self.available_qualities
            .iter()
            .map(|q| q.quality.clone())
            .collect()
    }
}

/// Concrete pair chosen for one download.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    pub title: String,
    pub quality: String,
    pub video: StreamDescriptor,
    pub audio: StreamDescriptor,
}

/// What a download request turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadPlan {
    Info(SourceInfo),
    Stream(StreamPlan),
}

/// Decides how to answer a download request.
///
/// Under [`QualityPolicy::Report`] a request without a quality label gets
/// the info report; every other request is planned by [`plan_stream`].
///
/// # Errors
///
/// Same as [`plan_stream`].
pub fn plan_download(
    metadata: &SourceMetadata,
    requested: Option<&str>,
    config: &SelectionConfig,
) -> Result<DownloadPlan, SelectionError> {
    let requested = requested.map(str::trim).filter(|q| !q.is_empty());
    let selection = SelectionResult::from_catalog(&metadata.catalog());

    if requested.is_none() && config.policy == QualityPolicy::Report {
        return Ok(DownloadPlan::Info(SourceInfo::from_selection(
            &metadata.title,
            &selection,
        )));
    }

    select_pair(&metadata.title, &selection, requested, config).map(DownloadPlan::Stream)
}

/// Picks the video/audio pair to remux for `requested`.
///
/// # Errors
///
/// - `SelectionError::QualityRequired` - No label under the report policy
/// - `SelectionError::QualityUnavailable` - Label not offered under the report policy
/// - `SelectionError::NoVideo` - Source has no selectable video
/// - `SelectionError::NoAudio` - Source has no audio stream
pub fn plan_stream(
    metadata: &SourceMetadata,
    requested: Option<&str>,
    config: &SelectionConfig,
) -> Result<StreamPlan, SelectionError> {
    let requested = requested.map(str::trim).filter(|q| !q.is_empty());
    let selection = SelectionResult::from_catalog(&metadata.catalog());
    select_pair(&metadata.title, &selection, requested, config)
}

fn select_pair(
    title: &str,
    selection: &SelectionResult,
    requested: Option<&str>,
    config: &SelectionConfig,
) -> Result<StreamPlan, SelectionError> {
    let (quality, video) = match config.policy {
        QualityPolicy::Report => {
            let requested = requested.ok_or(SelectionError::QualityRequired)?;
            if selection.videos().is_empty() {
                return Err(SelectionError::NoVideo);
            }
            let video = selection.video_for(requested).ok_or_else(|| {
                SelectionError::QualityUnavailable {
                    requested: requested.to_string(),
                    available: selection
                        .available_qualities()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                }
            })?;
            (requested.to_string(), video)
        }
        QualityPolicy::FallbackToFirst => {
            let wanted = requested.unwrap_or(&config.default_quality);
            match selection.video_for(wanted) {
                Some(video) => (wanted.to_string(), video),
                None => {
                    let (label, video) = selection.first_video().ok_or(SelectionError::NoVideo)?;
                    (label.to_string(), video)
                }
            }
        }
    };

    let audio = selection.audio().ok_or(SelectionError::NoAudio)?;

    Ok(StreamPlan {
        title: title.to_string(),
        quality,
        video: video.clone(),
        audio: audio.clone(),
    })
}
