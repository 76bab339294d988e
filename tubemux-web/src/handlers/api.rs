//! API handlers for source info, quality listing and downloads

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use tubemux_core::catalog::redact_locator;
use tubemux_core::request::{DownloadPlan, SourceInfo, plan_download};
use tubemux_core::selection::SelectionResult;
use tubemux_core::{SourceMetadata, TubemuxError};

use crate::error::ApiError;
use crate::server::AppState;
use crate::streaming::ResponseStreamer;

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: Option<String>,
    pub selected_quality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QualityRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QualityEntry {
    pub quality: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityListResponse {
    pub title: String,
    pub available_qualities: Vec<QualityEntry>,
}

fn require_url(url: Option<String>) -> Result<String, ApiError> {
    url.map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

async fn resolve(state: &AppState, url: &str) -> Result<SourceMetadata, ApiError> {
    state.resolver.resolve(url).await.map_err(|e| {
        error!(
            "Metadata resolution for {} failed via {}: {}",
            redact_locator(url),
            state.resolver.name(),
            e
        );
        ApiError::from(TubemuxError::from(e))
    })
}

/// `GET /api/download?url=`: title, qualities and audio bitrate.
pub async fn api_download_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<SourceInfo>, ApiError> {
    let url = require_url(query.url)?;
    let metadata = resolve(&state, &url).await?;
    let selection = SelectionResult::from_catalog(&metadata.catalog());

    Ok(Json(SourceInfo::from_selection(&metadata.title, &selection)))
}

/// `POST /api/download`: info report, error or streamed MP4 depending on
/// the requested quality and the configured policy.
pub async fn api_download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = parse_body(body)?;
    let url = require_url(request.url)?;
    let metadata = resolve(&state, &url).await?;

    let plan = plan_download(&metadata, request.selected_quality.as_deref(), &state.selection)
        .map_err(|e| {
            info!("Rejecting download of {}: {}", redact_locator(&url), e);
            ApiError::from(TubemuxError::from(e))
        })?;

    match plan {
        DownloadPlan::Info(info) => Ok(Json(info).into_response()),
        DownloadPlan::Stream(plan) => {
            info!(
                "Download of \"{}\" at {} (video {}, audio {})",
                plan.title, plan.quality, plan.video.format_id, plan.audio.format_id
            );
            let output = state
                .orchestrator
                .merge(Some(&plan.video), Some(&plan.audio))
                .await
                .map_err(|e| ApiError::from(TubemuxError::from(e)))?;

            ResponseStreamer::for_plan(&plan).respond(output).await
        }
    }
}

/// `POST /api/quality`: title and quality labels only.
pub async fn api_quality(
    State(state): State<AppState>,
    body: Result<Json<QualityRequest>, JsonRejection>,
) -> Result<Json<QualityListResponse>, ApiError> {
    let request = parse_body(body)?;
    let url = require_url(request.url)?;
    let metadata = resolve(&state, &url).await?;
    let selection = SelectionResult::from_catalog(&metadata.catalog());

    Ok(Json(QualityListResponse {
        title: metadata.title,
        available_qualities: selection
            .available_qualities()
            .into_iter()
            .map(|quality| QualityEntry {
                quality: quality.to_string(),
            })
            .collect(),
    }))
}
