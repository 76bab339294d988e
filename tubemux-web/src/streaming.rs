//! Streaming download responses.
//!
//! Headers are only committed once the remux produced its first chunk. A
//! failure before that point is still answered with a JSON error; a failure
//! after it aborts the response body so the client sees a truncated
//! transfer instead of a silently short file.

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use futures::{StreamExt, stream};
use tracing::{debug, warn};
use tubemux_core::delivery::{MP4_CONTENT_TYPE, content_disposition};
use tubemux_core::remux::RemuxError;
use tubemux_core::request::StreamPlan;
use tubemux_core::{RemuxStream, TubemuxError};

use crate::error::ApiError;

/// Builds the HTTP response for one remux job.
#[derive(Debug, Clone)]
pub struct ResponseStreamer {
    content_disposition: String,
}

impl ResponseStreamer {
    pub fn new(title: &str, quality: &str) -> Self {
        Self {
            content_disposition: content_disposition(title, quality),
        }
    }

    pub fn for_plan(plan: &StreamPlan) -> Self {
        Self::new(&plan.title, &plan.quality)
    }

    /// Waits for the first chunk of `output`, then streams the rest.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the remux fails or ends before producing any
    /// output.
    pub async fn respond(&self, mut output: RemuxStream) -> Result<Response, ApiError> {
        let job_id = output.job_id();

        let first = match output.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(ApiError::from(TubemuxError::from(e))),
            None => {
                warn!(job = %job_id, "Remux ended without output");
                return Err(ApiError::internal("Media conversion produced no output"));
            }
        };
        debug!(job = %job_id, "First chunk ready ({} bytes), streaming response", first.len());

        let rest = output.inspect(move |item| {
            if let Err(e) = item {
                warn!(job = %job_id, "Aborting download: {}", e);
            }
        });
        let body = Body::from_stream(stream::once(async move { Ok::<_, RemuxError>(first) }).chain(rest));

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, MP4_CONTENT_TYPE)
            .header(header::CONTENT_DISPOSITION, &self.content_disposition)
            .header(header::TRANSFER_ENCODING, "chunked")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(body)
            .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tubemux_core::StreamDescriptor;
    use tubemux_core::config::RemuxConfig;
    use tubemux_core::remux::{CannedRemuxer, RemuxOrchestrator};

    use super::*;

    async fn remux(remuxer: CannedRemuxer) -> RemuxStream {
        let orchestrator = RemuxOrchestrator::new(Arc::new(remuxer), &RemuxConfig::default());
        orchestrator
            .merge(
                Some(&StreamDescriptor::video("https://v.example.com/v", "720p")),
                Some(&StreamDescriptor::audio("https://a.example.com/a")),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_streams_first_chunk_and_rest() {
        let output = remux(CannedRemuxer::new([&b"ftyp"[..], &b"moof"[..]])).await;
        let response = ResponseStreamer::new("Clip", "720p")
            .respond(output)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Clip_720p.mp4\""
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ftypmoof");
    }

    #[tokio::test]
    async fn test_empty_output_is_error() {
        let output = remux(CannedRemuxer::new(Vec::<bytes::Bytes>::new())).await;
        let error = ResponseStreamer::new("Clip", "720p")
            .respond(output)
            .await
            .unwrap_err();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_failure_after_first_byte_aborts_body() {
        let output = remux(CannedRemuxer::new([&b"ftyp"[..], &b"moof"[..]]).failing_after(1)).await;
        let response = ResponseStreamer::new("Clip", "720p")
            .respond(output)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .is_err()
        );
    }
}
