//! Tubemux Web - JSON API and streaming download server

#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Resolves source metadata, answers quality queries and streams remuxed
//! MP4 downloads as they are produced.

pub mod error;
pub mod handlers;
pub mod server;
pub mod streaming;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, build_router, run_server};
pub use streaming::ResponseStreamer;
