//! Centralized configuration for Tubemux.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;
use std::time::Duration;

use crate::mode::RuntimeMode;
use crate::request::QualityPolicy;
use crate::selection::DEFAULT_QUALITY;

/// Central configuration for all Tubemux components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct TubemuxConfig {
    pub server: ServerConfig,
    pub remux: RemuxConfig,
    pub metadata: MetadataConfig,
    pub selection: SelectionConfig,
    pub runtime_mode: RuntimeMode,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Remux subprocess and output relay configuration.
#[derive(Debug, Clone)]
pub struct RemuxConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,
    /// Target audio codec; video is always copied
    pub audio_codec: String,
    /// Target audio bitrate passed as `-b:a` (None = encoder default)
    pub audio_bitrate: Option<String>,
    /// Per-input network I/O timeout handed to ffmpeg
    pub source_io_timeout: Duration,
    /// Maximum wait for the first output chunk
    pub first_byte_timeout: Duration,
    /// Maximum wait between two output chunks
    pub stall_timeout: Duration,
    /// Read size for subprocess stdout
    pub chunk_size: usize,
    /// Probe both locators before spawning ffmpeg
    pub preflight: bool,
    /// Timeout for each preflight probe
    pub preflight_timeout: Duration,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            audio_codec: "aac".to_string(),
            audio_bitrate: None,
            source_io_timeout: Duration::from_secs(15),
            first_byte_timeout: Duration::from_secs(30),
            stall_timeout: Duration::from_secs(60),
            chunk_size: 64 * 1024, // 64 KiB
            preflight: true,
            preflight_timeout: Duration::from_secs(10),
        }
    }
}

/// Metadata resolver configuration.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// yt-dlp executable
    pub ytdlp_path: PathBuf,
    /// Maximum time allowed for one resolution
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            timeout: Duration::from_secs(45),
        }
    }
}

/// Request-level quality selection policy.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// What to do when the requested quality is missing or unavailable
    pub policy: QualityPolicy,
    /// Quality used by the fallback policy when the client names none
    pub default_quality: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: QualityPolicy::Report,
            default_quality: DEFAULT_QUALITY.to_string(),
        }
    }
}

impl TubemuxConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("TUBEMUX_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("TUBEMUX_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.server.port = port;
            }
        }

        if let Ok(mode) = std::env::var("TUBEMUX_MODE") {
            if let Ok(mode) = mode.parse::<RuntimeMode>() {
                config.runtime_mode = mode;
            }
        }

        // Remux overrides
        if let Ok(path) = std::env::var("TUBEMUX_FFMPEG_PATH") {
            config.remux.ffmpeg_path = PathBuf::from(path);
        }

        if let Ok(codec) = std::env::var("TUBEMUX_AUDIO_CODEC") {
            config.remux.audio_codec = codec;
        }

        if let Ok(bitrate) = std::env::var("TUBEMUX_AUDIO_BITRATE") {
            config.remux.audio_bitrate = Some(bitrate);
        }

        if let Ok(timeout) = std::env::var("TUBEMUX_STALL_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.remux.stall_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(preflight) = std::env::var("TUBEMUX_PREFLIGHT") {
            config.remux.preflight = preflight.parse().unwrap_or(true);
        }

        // Metadata overrides
        if let Ok(path) = std::env::var("TUBEMUX_YTDLP_PATH") {
            config.metadata.ytdlp_path = PathBuf::from(path);
        }

        if let Ok(timeout) = std::env::var("TUBEMUX_METADATA_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.metadata.timeout = Duration::from_secs(seconds);
            }
        }

        // Selection overrides
        if let Ok(policy) = std::env::var("TUBEMUX_QUALITY_POLICY") {
            if let Ok(policy) = policy.parse::<QualityPolicy>() {
                config.selection.policy = policy;
            }
        }

        if let Ok(quality) = std::env::var("TUBEMUX_DEFAULT_QUALITY") {
            config.selection.default_quality = quality;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            remux: RemuxConfig {
                first_byte_timeout: Duration::from_secs(5),
                stall_timeout: Duration::from_secs(5),
                preflight: false,
                ..Default::default()
            },
            runtime_mode: RuntimeMode::Development,
            ..Default::default()
        }
    }

    /// Address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
