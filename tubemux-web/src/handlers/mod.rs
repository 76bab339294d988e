//! HTTP request handlers organized by functionality

pub mod api;
pub mod health;

// Re-export handler functions
pub use api::{
    DownloadRequest, InfoQuery, QualityListResponse, QualityRequest, api_download,
    api_download_info, api_quality,
};
pub use health::{HealthResponse, health};
