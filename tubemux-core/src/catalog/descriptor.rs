//! Elementary stream descriptors as reported by the metadata source.

use serde::{Deserialize, Serialize};

/// Kind of media carried by an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Video track without audio
    VideoOnly,
    /// Audio track without video
    AudioOnly,
}

/// Coarse audio quality tier attached to audio-only streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQualityTier {
    Low,
    Medium,
    High,
}

impl AudioQualityTier {
    /// Parses a free-form quality note such as `"medium"` or
    /// `"AUDIO_QUALITY_HIGH"`.
    pub fn from_note(note: &str) -> Option<Self> {
        let note = note.to_ascii_lowercase();
        if note.contains("high") {
            Some(Self::High)
        } else if note.contains("medium") {
            Some(Self::Medium)
        } else if note.contains("low") {
            Some(Self::Low)
        } else {
            None
        }
    }
}

/// One elementary stream candidate.
///
/// Numeric attributes are optional because metadata sources omit them
/// freely; the `*_or_zero` accessors give the total ordering the selectors
/// rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub media_kind: MediaKind,
    /// Fetchable reference, typically a time-limited signed URL.
    pub locator: String,
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub quality_label: Option<String>,
    #[serde(default)]
    pub frame_rate: Option<u32>,
    /// Bits per second.
    #[serde(default)]
    pub bitrate: Option<u64>,
    /// Bits per second, audio only.
    #[serde(default)]
    pub audio_bitrate: Option<u64>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub channel_count: Option<u16>,
    #[serde(default)]
    pub audio_quality_tier: Option<AudioQualityTier>,
    #[serde(default)]
    pub codec_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub container: Option<String>,
    /// `Some(false)` marks an alternate-language or descriptive audio track.
    #[serde(default)]
    pub is_default_track: Option<bool>,
}

impl StreamDescriptor {
    fn new(media_kind: MediaKind, locator: impl Into<String>) -> Self {
        Self {
            media_kind,
            locator: locator.into(),
            format_id: String::new(),
            quality_label: None,
            frame_rate: None,
            bitrate: None,
            audio_bitrate: None,
            sample_rate: None,
            channel_count: None,
            audio_quality_tier: None,
            codec_id: String::new(),
            width: None,
            height: None,
            container: None,
            is_default_track: None,
        }
    }

    /// Creates a video-only descriptor for the given quality label.
    pub fn video(locator: impl Into<String>, quality_label: impl Into<String>) -> Self {
        let mut descriptor = Self::new(MediaKind::VideoOnly, locator);
        descriptor.quality_label = Some(quality_label.into());
        descriptor
    }

    /// Creates an audio-only descriptor.
    pub fn audio(locator: impl Into<String>) -> Self {
        Self::new(MediaKind::AudioOnly, locator)
    }

    pub fn with_format_id(mut self, format_id: impl Into<String>) -> Self {
        self.format_id = format_id.into();
        self
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn with_audio_bitrate(mut self, bitrate: u64) -> Self {
        self.audio_bitrate = Some(bitrate);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channel_count = Some(channels);
        self
    }

    pub fn with_tier(mut self, tier: AudioQualityTier) -> Self {
        self.audio_quality_tier = Some(tier);
        self
    }

    pub fn with_codec(mut self, codec_id: impl Into<String>) -> Self {
        self.codec_id = codec_id.into();
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_default_track(mut self, is_default: bool) -> Self {
        self.is_default_track = Some(is_default);
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_kind == MediaKind::VideoOnly
    }

    pub fn is_audio(&self) -> bool {
        self.media_kind == MediaKind::AudioOnly
    }

    pub fn frame_rate_or_zero(&self) -> u32 {
        self.frame_rate.unwrap_or(0)
    }

    pub fn bitrate_or_zero(&self) -> u64 {
        self.bitrate.unwrap_or(0)
    }

    /// Audio bitrate used for ranking; a zero `audio_bitrate` counts as
    /// absent and falls back to the overall bitrate.
    pub fn effective_audio_bitrate(&self) -> u64 {
        self.audio_bitrate
            .filter(|bitrate| *bitrate > 0)
            .or(self.bitrate)
            .unwrap_or(0)
    }

    pub fn sample_rate_or_zero(&self) -> u32 {
        self.sample_rate.unwrap_or(0)
    }

    pub fn channel_count_or_zero(&self) -> u16 {
        self.channel_count.unwrap_or(0)
    }

    /// Host part of the locator, safe to log.
    ///
    /// Signed locators carry credentials in their query string, so log
    /// lines only ever mention the host.
    pub fn locator_host(&self) -> String {
        redact_locator(&self.locator)
    }
}

/// Reduces a locator to its host for logging.
pub fn redact_locator(locator: &str) -> String {
    match url::Url::parse(locator) {
        Ok(parsed) => parsed
            .host_str()
            .map(str::to_string)
            .unwrap_or_else(|| parsed.scheme().to_string()),
        Err(_) => "<opaque>".to_string(),
    }
}
