//! Remux job orchestration.
//!
//! Validates the selected pair, optionally probes both sources, starts a
//! single remux process and relays its output with bounded waits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{StreamExt, stream};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::{ByteStream, InputRole, RemuxError, RemuxJob, RemuxStream, Remuxer, SourceProbe};
use crate::catalog::StreamDescriptor;
use crate::config::RemuxConfig;

/// Turns a selected video/audio pair into a live fMP4 stream.
pub struct RemuxOrchestrator {
    remuxer: Arc<dyn Remuxer>,
    probe: Option<SourceProbe>,
    first_byte_timeout: Duration,
    stall_timeout: Duration,
}

impl RemuxOrchestrator {
    /// Creates an orchestrator without source probing.
    pub fn new(remuxer: Arc<dyn Remuxer>, config: &RemuxConfig) -> Self {
        Self {
            remuxer,
            probe: None,
            first_byte_timeout: config.first_byte_timeout,
            stall_timeout: config.stall_timeout,
        }
    }

    /// Probes both locators before each remux start.
    pub fn with_probe(mut self, probe: SourceProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn remuxer_name(&self) -> &'static str {
        self.remuxer.name()
    }

    /// Starts one remux of `video` and `audio`.
    ///
    /// The remuxer is started exactly once per successful call and never
    /// retried. Output chunks are relayed in production order. The first
    /// chunk must arrive within the first-byte timeout and every later chunk
    /// within the stall timeout, otherwise the stream ends with
    /// `RemuxError::Stalled` and the process is terminated.
    ///
    /// # Errors
    ///
    /// - `RemuxError::MissingInput` - Either input is absent or has no locator
    /// - `RemuxError::SourceRejected` - Probe found an expired or forbidden source
    /// - `RemuxError::SourceUnavailable` - Probe could not reach a source
    /// - `RemuxError::SpawnFailed` - Remux process could not be started
    pub async fn merge(
        &self,
        video: Option<&StreamDescriptor>,
        audio: Option<&StreamDescriptor>,
    ) -> Result<RemuxStream, RemuxError> {
        let video = require_input(InputRole::Video, video)?;
        let audio = require_input(InputRole::Audio, audio)?;

        let job = RemuxJob::new(video.locator.clone(), audio.locator.clone());
        info!(
            job = %job.id,
            "Starting remux via {}: video {} ({}) from {} + audio {} ({}) from {}",
            self.remuxer.name(),
            video.format_id,
            video.quality_label.as_deref().unwrap_or("unlabeled"),
            video.locator_host(),
            audio.format_id,
            audio.codec_id,
            audio.locator_host(),
        );

        if let Some(probe) = &self.probe {
            if let Err(e) = tokio::try_join!(
                probe.check(InputRole::Video, &job.video),
                probe.check(InputRole::Audio, &job.audio),
            ) {
                warn!(job = %job.id, "Source probe failed: {}", e);
                return Err(e);
            }
        }

        let output = self.remuxer.start(&job).await.inspect_err(|e| {
            error!(job = %job.id, "Failed to start remuxer: {}", e);
        })?;

        let relay = JobRelay {
            job_id: job.id,
            output: Some(output),
            first_byte_timeout: self.first_byte_timeout,
            stall_timeout: self.stall_timeout,
            bytes: 0,
            chunks: 0,
            started: Instant::now(),
        };

        Ok(RemuxStream::new(job.id, Box::pin(relay.into_stream())))
    }
}

fn require_input(
    input: InputRole,
    descriptor: Option<&StreamDescriptor>,
) -> Result<&StreamDescriptor, RemuxError> {
    match descriptor {
        Some(descriptor) if !descriptor.locator.trim().is_empty() => Ok(descriptor),
        _ => Err(RemuxError::MissingInput { input }),
    }
}

/// Relay state for one job's output.
///
/// `output` is cleared as soon as the job ends, which terminates the
/// process. Dropping the relay while `output` is still set means the
/// consumer went away.
struct JobRelay {
    job_id: Uuid,
    output: Option<ByteStream>,
    first_byte_timeout: Duration,
    stall_timeout: Duration,
    bytes: u64,
    chunks: u64,
    started: Instant,
}

impl JobRelay {
    fn into_stream(self) -> impl futures::Stream<Item = Result<bytes::Bytes, RemuxError>> + Send {
        stream::unfold(self, |mut relay| async move {
            let output = relay.output.as_mut()?;

            let limit = if relay.chunks == 0 {
                relay.first_byte_timeout
            } else {
                relay.stall_timeout
            };

            let next = tokio::time::timeout(limit, output.next()).await;
            match next {
                Ok(Some(Ok(chunk))) => {
                    relay.bytes += chunk.len() as u64;
                    relay.chunks += 1;
                    trace!(job = %relay.job_id, "Relayed chunk {} ({} bytes)", relay.chunks, chunk.len());
                    Some((Ok(chunk), relay))
                }
                Ok(Some(Err(e))) => {
                    relay.output = None;
                    error!(
                        job = %relay.job_id,
                        "Remux failed after {} bytes: {}",
                        relay.bytes, e
                    );
                    Some((Err(e), relay))
                }
                Ok(None) => {
                    relay.output = None;
                    info!(
                        job = %relay.job_id,
                        "Remux completed: {} bytes in {} chunks, {:.2}s",
                        relay.bytes,
                        relay.chunks,
                        relay.started.elapsed().as_secs_f64()
                    );
                    None
                }
                Err(_) => {
                    relay.output = None;
                    warn!(
                        job = %relay.job_id,
                        "Remux stalled after {} bytes, no output for {}s",
                        relay.bytes,
                        limit.as_secs()
                    );
                    Some((Err(RemuxError::Stalled { waited: limit }), relay))
                }
            }
        })
    }
}

impl Drop for JobRelay {
    fn drop(&mut self) {
        if self.output.is_some() {
            debug!(
                job = %self.job_id,
                "Remux cancelled by consumer after {} bytes, {:.2}s",
                self.bytes,
                self.started.elapsed().as_secs_f64()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::remux::CannedRemuxer;

    fn pair() -> (StreamDescriptor, StreamDescriptor) {
        (
            StreamDescriptor::video("https://v.example.com/v", "720p").with_format_id("136"),
            StreamDescriptor::audio("https://a.example.com/a").with_format_id("140"),
        )
    }

    fn orchestrator(remuxer: Arc<CannedRemuxer>) -> RemuxOrchestrator {
        RemuxOrchestrator::new(remuxer, &RemuxConfig::default())
    }

    #[tokio::test]
    async fn test_missing_audio_never_starts_remuxer() {
        let remuxer = Arc::new(CannedRemuxer::new([&b"x"[..]]));
        let orchestrator = orchestrator(Arc::clone(&remuxer));
        let (video, _) = pair();

        let result = orchestrator.merge(Some(&video), None).await;
        assert!(matches!(
            result,
            Err(RemuxError::MissingInput {
                input: InputRole::Audio
            })
        ));
        assert_eq!(remuxer.start_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_locator_is_missing_input() {
        let remuxer = Arc::new(CannedRemuxer::new([&b"x"[..]]));
        let orchestrator = orchestrator(Arc::clone(&remuxer));
        let (_, audio) = pair();
        let video = StreamDescriptor::video("", "720p");

        let result = orchestrator.merge(Some(&video), Some(&audio)).await;
        assert!(matches!(
            result,
            Err(RemuxError::MissingInput {
                input: InputRole::Video
            })
        ));
        assert_eq!(remuxer.start_count(), 0);
    }

    #[tokio::test]
    async fn test_relays_chunks_in_order() {
        let remuxer = Arc::new(CannedRemuxer::new([&b"ftyp"[..], &b"moov"[..], &b"moof"[..]]));
        let orchestrator = orchestrator(Arc::clone(&remuxer));
        let (video, audio) = pair();

        let stream = orchestrator.merge(Some(&video), Some(&audio)).await.unwrap();
        let job_id = stream.job_id();
        let chunks: Vec<Bytes> = stream.map(Result::unwrap).collect().await;

        assert_eq!(
            chunks,
            vec![Bytes::from("ftyp"), Bytes::from("moov"), Bytes::from("moof")]
        );
        let jobs = remuxer.started_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, job_id);
        assert_eq!(jobs[0].video, video.locator);
        assert_eq!(jobs[0].audio, audio.locator);
    }

    #[tokio::test]
    async fn test_process_failure_is_not_retried() {
        let remuxer = Arc::new(CannedRemuxer::new([&b"a"[..], &b"b"[..]]).failing_after(1));
        let orchestrator = orchestrator(Arc::clone(&remuxer));
        let (video, audio) = pair();

        let items: Vec<_> = orchestrator
            .merge(Some(&video), Some(&audio))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(RemuxError::ProcessFailed { .. })));
        assert_eq!(remuxer.start_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_first_byte_stalls_and_kills_process() {
        let remuxer = Arc::new(
            CannedRemuxer::new([&b"late"[..]]).paced(Duration::from_secs(120)),
        );
        let config = RemuxConfig {
            first_byte_timeout: Duration::from_secs(5),
            ..RemuxConfig::default()
        };
        let orchestrator = RemuxOrchestrator::new(Arc::clone(&remuxer) as Arc<dyn Remuxer>, &config);
        let (video, audio) = pair();

        let mut stream = orchestrator.merge(Some(&video), Some(&audio)).await.unwrap();
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(RemuxError::Stalled { waited }) if waited == Duration::from_secs(5)));
        assert_eq!(remuxer.active_processes(), 0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_between_chunks() {
        let remuxer = Arc::new(
            CannedRemuxer::new([&b"a"[..], &b"b"[..]]).paced(Duration::from_secs(10)),
        );
        let config = RemuxConfig {
            first_byte_timeout: Duration::from_secs(30),
            stall_timeout: Duration::from_secs(5),
            ..RemuxConfig::default()
        };
        let orchestrator = RemuxOrchestrator::new(Arc::clone(&remuxer) as Arc<dyn Remuxer>, &config);
        let (video, audio) = pair();

        let mut stream = orchestrator.merge(Some(&video), Some(&audio)).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("a"));
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(RemuxError::Stalled { .. })
        ));
    }
}
