//! HTTP server for Tubemux
//!
//! Wires the metadata resolver and the remux orchestrator for the selected
//! runtime mode into an axum router.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tubemux_core::config::SelectionConfig;
use tubemux_core::metadata::{FixtureResolver, YtDlpResolver};
use tubemux_core::remux::{CannedRemuxer, FfmpegRemuxer, SourceProbe};
use tubemux_core::{
    MetadataResolver, RemuxOrchestrator, Remuxer, RuntimeMode, TubemuxConfig, TubemuxError,
};

use crate::handlers::{api_download, api_download_info, api_quality, health};

/// Shared handles passed to every request.
///
/// Holds no per-request state; each download owns its own remux job.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn MetadataResolver>,
    pub orchestrator: Arc<RemuxOrchestrator>,
    pub selection: SelectionConfig,
    pub mode: RuntimeMode,
}

impl AppState {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        orchestrator: Arc<RemuxOrchestrator>,
        selection: SelectionConfig,
        mode: RuntimeMode,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            selection,
            mode,
        }
    }

    /// Builds the components for `config.runtime_mode`.
    ///
    /// Production resolves with yt-dlp and remuxes with ffmpeg. Development
    /// serves the demo fixture through the canned remuxer and needs neither
    /// executable.
    ///
    /// # Errors
    ///
    /// Returns `TubemuxError::Configuration` if the preflight HTTP client
    /// cannot be created.
    pub fn from_config(config: &TubemuxConfig) -> Result<Self, TubemuxError> {
        type Components = (Arc<dyn MetadataResolver>, Arc<dyn Remuxer>);
        let (resolver, remuxer): Components = match config.runtime_mode {
            RuntimeMode::Production => (
                Arc::new(YtDlpResolver::from_config(&config.metadata)),
                Arc::new(FfmpegRemuxer::from_config(&config.remux)),
            ),
            RuntimeMode::Development => {
                (Arc::new(FixtureResolver::demo()), Arc::new(CannedRemuxer::demo()))
            }
        };

        let mut orchestrator = RemuxOrchestrator::new(remuxer, &config.remux);
        if config.remux.preflight && config.runtime_mode.is_production() {
            let probe = SourceProbe::new(config.remux.preflight_timeout).map_err(|e| {
                TubemuxError::Configuration {
                    reason: format!("Failed to create preflight client: {e}"),
                }
            })?;
            orchestrator = orchestrator.with_probe(probe);
        }

        Ok(Self::new(
            resolver,
            Arc::new(orchestrator),
            config.selection.clone(),
            config.runtime_mode,
        ))
    }
}

/// Creates the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", get(api_download_info).post(api_download))
        .route("/api/quality", post(api_quality))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until the process exits.
///
/// # Errors
///
/// - `TubemuxError::Configuration` - Components could not be built
/// - `TubemuxError::Io` - Address could not be bound or serving failed
pub async fn run_server(config: TubemuxConfig) -> Result<(), TubemuxError> {
    let state = AppState::from_config(&config)?;
    info!(
        "Starting in {} mode (resolver: {}, remuxer: {})",
        state.mode,
        state.resolver.name(),
        state.orchestrator.remuxer_name()
    );

    let app = build_router(state);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Tubemux server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_components() {
        let state = AppState::from_config(&TubemuxConfig::for_testing()).unwrap();
        assert_eq!(state.mode, RuntimeMode::Development);
        assert_eq!(state.resolver.name(), "fixture");
        assert_eq!(state.orchestrator.remuxer_name(), "canned");
    }

    #[test]
    fn test_production_components() {
        let config = TubemuxConfig {
            runtime_mode: RuntimeMode::Production,
            ..TubemuxConfig::for_testing()
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.resolver.name(), "yt-dlp");
        assert_eq!(state.orchestrator.remuxer_name(), "ffmpeg");
    }
}
