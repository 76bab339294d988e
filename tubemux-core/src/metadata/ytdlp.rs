//! Metadata resolution through the `yt-dlp` executable.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{MetadataError, MetadataResolver, SourceMetadata, validate_source};
use crate::catalog::{AudioQualityTier, StreamDescriptor};
use crate::config::MetadataConfig;

/// yt-dlp marks the original or default audio track with a language
/// preference at or above this value when a source carries several tracks.
/// Once one track is marked, every other audio track counts as non-default.
/// With no marked track, no track is flagged either way.
const DEFAULT_TRACK_PREFERENCE: i64 = 5;

/// Subset of `yt-dlp --dump-single-json` output used for stream selection.
#[derive(Debug, Deserialize)]
struct InfoJson {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<FormatJson>,
}

#[derive(Debug, Deserialize)]
struct FormatJson {
    format_id: Option<String>,
    url: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    ext: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<f64>,
    /// Total bitrate in kbit/s
    tbr: Option<f64>,
    /// Audio bitrate in kbit/s
    abr: Option<f64>,
    asr: Option<u32>,
    audio_channels: Option<u16>,
    format_note: Option<String>,
    language_preference: Option<i64>,
}

impl FormatJson {
    fn is_video_only(&self) -> bool {
        codec_present(self.vcodec.as_deref()) && self.acodec.as_deref() == Some("none")
    }

    fn is_audio_only(&self) -> bool {
        codec_present(self.acodec.as_deref()) && self.vcodec.as_deref() == Some("none")
    }

    /// Quality label as the source names it. The leading `<n>p` token of
    /// `format_note` wins, so letterboxed 1920x800 video stays "1080p".
    /// Without one, the shorter pixel side is used.
    fn quality_label(&self) -> Option<String> {
        if let Some(label) = self.format_note.as_deref().and_then(label_from_note) {
            return Some(label);
        }
        let lines = match (self.width, self.height) {
            (Some(width), Some(height)) => width.min(height),
            (None, Some(height)) => height,
            _ => return None,
        };
        Some(format!("{lines}p"))
    }
}

/// "1080p60" and "1080p HDR" both yield "1080p".
fn label_from_note(note: &str) -> Option<String> {
    let note = note.trim_start();
    let digits = note.bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0 && note[digits..].starts_with('p')).then(|| format!("{}p", &note[..digits]))
}

fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(codec) if codec != "none")
}

fn kbps_to_bps(kbps: Option<f64>) -> Option<u64> {
    kbps.filter(|value| value.is_finite() && *value > 0.0)
        .map(|value| (value * 1000.0).round() as u64)
}

/// Resolver backed by the `yt-dlp` executable.
pub struct YtDlpResolver {
    program: PathBuf,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(config.ytdlp_path.clone(), config.timeout)
    }

    fn build_args(source: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            source.to_string(),
        ]
    }

    async fn run(&self, source: &str) -> Result<Vec<u8>, MetadataError> {
        let child = Command::new(&self.program)
            .args(Self::build_args(source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MetadataError::ResolverUnavailable {
                reason: format!("failed to start {}: {e}", self.program.display()),
            })?;

        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| MetadataError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| MetadataError::ResolverUnavailable {
                reason: format!("failed to wait for {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("yt-dlp failed with {}: {}", output.status, stderr);
            return Err(MetadataError::ResolverFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

/// Maps a `yt-dlp` JSON document into source metadata.
///
/// Muxed formats, storyboards and formats without a URL are skipped.
///
/// # Errors
///
/// - `MetadataError::Parse` - Document is not valid yt-dlp JSON
pub fn parse_info_json(raw: &[u8]) -> Result<SourceMetadata, MetadataError> {
    let info: InfoJson = serde_json::from_slice(raw).map_err(|e| MetadataError::Parse {
        reason: e.to_string(),
    })?;

    // A default-track marker only means something when some track carries it
    let has_marked_default = info.formats.iter().any(|format| {
        format.is_audio_only()
            && format
                .language_preference
                .is_some_and(|preference| preference >= DEFAULT_TRACK_PREFERENCE)
    });

    let streams = info
        .formats
        .into_iter()
        .filter_map(|format| {
            let locator = format.url.clone()?;

            let descriptor = if format.is_video_only() {
                let label = format.quality_label()?;
                let mut descriptor = StreamDescriptor::video(locator, label);
                descriptor.codec_id = format.vcodec.clone().unwrap_or_default();
                descriptor.frame_rate = format
                    .fps
                    .filter(|fps| fps.is_finite() && *fps > 0.0)
                    .map(|fps| fps.round() as u32);
                descriptor.width = format.width;
                descriptor.height = format.height;
                descriptor
            } else if format.is_audio_only() {
                let mut descriptor = StreamDescriptor::audio(locator);
                descriptor.codec_id = format.acodec.clone().unwrap_or_default();
                descriptor.audio_bitrate = kbps_to_bps(format.abr);
                descriptor.sample_rate = format.asr;
                descriptor.channel_count = format.audio_channels;
                descriptor.audio_quality_tier = format
                    .format_note
                    .as_deref()
                    .and_then(AudioQualityTier::from_note);
                if has_marked_default {
                    descriptor.is_default_track = Some(
                        format
                            .language_preference
                            .is_some_and(|preference| preference >= DEFAULT_TRACK_PREFERENCE),
                    );
                }
                descriptor
            } else {
                return None;
            };

            let mut descriptor = descriptor;
            descriptor.format_id = format.format_id.unwrap_or_default();
            descriptor.bitrate = kbps_to_bps(format.tbr);
            descriptor.container = format.ext;
            Some(descriptor)
        })
        .collect();

    Ok(SourceMetadata {
        title: info.title.unwrap_or_else(|| "untitled".to_string()),
        streams,
    })
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    async fn resolve(&self, source: &str) -> Result<SourceMetadata, MetadataError> {
        let source = validate_source(source)?;
        debug!("Resolving metadata for {}", source.host_str().unwrap_or("?"));

        let raw = self.run(source.as_str()).await?;
        let metadata = parse_info_json(&raw)?;

        info!(
            "Resolved '{}': {} elementary streams",
            metadata.title,
            metadata.streams.len()
        );
        Ok(metadata)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
