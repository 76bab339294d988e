//! Liveness endpoint

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: String,
    pub resolver: &'static str,
    pub remuxer: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.mode.to_string(),
        resolver: state.resolver.name(),
        remuxer: state.orchestrator.remuxer_name(),
    })
}
