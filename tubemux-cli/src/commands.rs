//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use tubemux_core::request::{AudioQuality, SourceInfo};
use tubemux_core::selection::SelectionResult;
use tubemux_core::{MetadataResolver, RuntimeMode, TubemuxConfig};
use tubemux_web::{AppState, run_server};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the download server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Runtime mode (production or development)
        #[arg(long)]
        mode: Option<RuntimeMode>,
        /// ffmpeg executable
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
        /// yt-dlp executable
        #[arg(long)]
        ytdlp: Option<PathBuf>,
    },
    /// Print available qualities and the best audio track for a source
    Info {
        /// Source URL
        url: String,
        /// Runtime mode (production or development)
        #[arg(long)]
        mode: Option<RuntimeMode>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of the command that failed
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            mode,
            ffmpeg,
            ytdlp,
        } => {
            let mut config = TubemuxConfig::from_env();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            apply_overrides(&mut config, mode, ffmpeg, ytdlp);
            start_server(config).await
        }
        Commands::Info { url, mode } => {
            let mut config = TubemuxConfig::from_env();
            apply_overrides(&mut config, mode, None, None);
            show_info(config, &url).await
        }
    }
}

fn apply_overrides(
    config: &mut TubemuxConfig,
    mode: Option<RuntimeMode>,
    ffmpeg: Option<PathBuf>,
    ytdlp: Option<PathBuf>,
) {
    if let Some(mode) = mode {
        config.runtime_mode = mode;
    }
    if let Some(ffmpeg) = ffmpeg {
        config.remux.ffmpeg_path = ffmpeg;
    }
    if let Some(ytdlp) = ytdlp {
        config.metadata.ytdlp_path = ytdlp;
    }
}

/// Start the download server
///
/// # Errors
/// - Server components could not be built
/// - Listener could not be bound
pub async fn start_server(config: TubemuxConfig) -> anyhow::Result<()> {
    let address = config.bind_address();
    run_server(config)
        .await
        .with_context(|| format!("Server on {address} failed"))
}

/// Resolve `url` and print what a download could offer
///
/// # Errors
/// - Metadata resolution failed
pub async fn show_info(config: TubemuxConfig, url: &str) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let metadata = state
        .resolver
        .resolve(url)
        .await
        .with_context(|| format!("Failed to resolve {url}"))?;

    let selection = SelectionResult::from_catalog(&metadata.catalog());
    print!("{}", render_info(&SourceInfo::from_selection(&metadata.title, &selection)));

    match selection.audio() {
        Some(audio) => println!(
            "Best audio: format {} ({}, {} Hz, {} ch)",
            audio.format_id,
            audio.codec_id,
            audio.sample_rate_or_zero(),
            audio.channel_count_or_zero()
        ),
        None => println!("Best audio: none"),
    }

    Ok(())
}

fn render_info(info: &SourceInfo) -> String {
    let mut out = format!("Title: {}\n", info.title);

    if info.available_qualities.is_empty() {
        out.push_str("No downloadable qualities\n");
    }
    for quality in &info.available_qualities {
        let size = match (quality.width, quality.height) {
            (Some(width), Some(height)) => format!("{width}x{height}"),
            _ => "unknown size".to_string(),
        };
        let fps = quality
            .fps
            .map(|fps| format!("{fps} fps"))
            .unwrap_or_else(|| "unknown fps".to_string());
        let container = quality.container.as_deref().unwrap_or("unknown");
        out.push_str(&format!(
            "  {:>6}  {size}, {fps}, {container}\n",
            quality.quality
        ));
    }

    let audio = match &info.audio_quality {
        AudioQuality::Bitrate(bitrate) => format!("{} kbit/s", bitrate / 1000),
        AudioQuality::Unknown(label) => (*label).to_string(),
    };
    out.push_str(&format!("Audio quality: {audio}\n"));
    out
}
