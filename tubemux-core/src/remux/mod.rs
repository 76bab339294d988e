//! Streaming remux of one video and one audio elementary stream into
//! fragmented MP4.
//!
//! The [`RemuxOrchestrator`] validates the selected pair, starts exactly one
//! remux process through a [`Remuxer`] and hands back a [`RemuxStream`]: a
//! live, non-restartable sequence of output chunks. Dropping the stream
//! tears the process down together with its source connections.

mod canned;
mod ffmpeg;
mod orchestrator;
mod preflight;
mod traits;

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
pub use canned::CannedRemuxer;
pub use ffmpeg::{FfmpegRemuxer, RemuxingOptions};
use futures::Stream;
pub use orchestrator::RemuxOrchestrator;
pub use preflight::SourceProbe;
use thiserror::Error;
pub use traits::Remuxer;
use uuid::Uuid;

use crate::catalog::redact_locator;

/// Boxed output of a running remux process.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RemuxError>> + Send>>;

/// Which of the two remux inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Video,
    Audio,
}

impl std::fmt::Display for InputRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputRole::Video => write!(f, "video"),
            InputRole::Audio => write!(f, "audio"),
        }
    }
}

/// Errors that can occur while remuxing.
#[derive(Debug, Error)]
pub enum RemuxError {
    /// No stream was selected for one of the inputs.
    #[error("No {input} stream selected")]
    MissingInput { input: InputRole },

    /// Source answered with an authorization failure, usually an expired link.
    #[error("{input} source rejected the request with HTTP {status}")]
    SourceRejected { input: InputRole, status: u16 },

    /// Source could not be reached or answered with an error.
    #[error("{input} source unavailable: {reason}")]
    SourceUnavailable { input: InputRole, reason: String },

    /// Remux process could not be started.
    #[error("Failed to start remuxer: {reason}")]
    SpawnFailed { reason: String },

    /// Remux process exited unsuccessfully.
    #[error("Remuxer exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    /// No output arrived within the allowed wait.
    #[error("Remuxer produced no output for {}s", waited.as_secs())]
    Stalled { waited: Duration },

    /// Reading remux output failed.
    #[error("Remux I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One in-flight merge of a video and an audio source.
#[derive(Clone)]
pub struct RemuxJob {
    pub id: Uuid,
    pub video: String,
    pub audio: String,
}

impl RemuxJob {
    pub fn new(video: impl Into<String>, audio: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            video: video.into(),
            audio: audio.into(),
        }
    }

    pub fn locator(&self, input: InputRole) -> &str {
        match input {
            InputRole::Video => &self.video,
            InputRole::Audio => &self.audio,
        }
    }
}

// Locators are credentials; Debug output shows hosts only
impl std::fmt::Debug for RemuxJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemuxJob")
            .field("id", &self.id)
            .field("video", &redact_locator(&self.video))
            .field("audio", &redact_locator(&self.audio))
            .finish()
    }
}

/// Live remux output for one job.
///
/// Finite and not restartable: a fresh stream needs a fresh
/// [`RemuxOrchestrator::merge`] call. Dropping it before the end cancels the
/// job.
pub struct RemuxStream {
    job_id: Uuid,
    inner: ByteStream,
}

impl RemuxStream {
    pub(crate) fn new(job_id: Uuid, inner: ByteStream) -> Self {
        Self { job_id, inner }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

impl Stream for RemuxStream {
    type Item = Result<Bytes, RemuxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for RemuxStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemuxStream")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}
