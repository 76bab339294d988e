//! Remuxer abstraction for both production and simulation modes

use async_trait::async_trait;

use super::{ByteStream, RemuxError, RemuxJob};

/// Starts remux processes.
///
/// An implementation merges the first video stream of `job.video` and the
/// first audio stream of `job.audio` into fragmented MP4 and returns its
/// output as it is produced. Every call starts a new, independent process;
/// dropping the returned stream must terminate that process and release
/// both source connections.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Starts one remux process for `job`.
    ///
    /// # Errors
    ///
    /// - `RemuxError::SpawnFailed` - Process could not be started
    async fn start(&self, job: &RemuxJob) -> Result<ByteStream, RemuxError>;

    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;
}
