//! Remuxer replaying canned output, used in development mode and tests.
//!
//! Each started job counts as one live process holding two source
//! connections until its stream finishes or is dropped, so callers can check
//! that cancellation releases everything.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use tracing::debug;

use super::{ByteStream, RemuxError, RemuxJob, Remuxer};

/// Fake fMP4 prefix emitted by [`CannedRemuxer::demo`].
const DEMO_HEADER: &[u8] = b"\x00\x00\x00\x18ftypisom\x00\x00\x02\x00isomiso6";

/// Started jobs kept for inspection; older ones are forgotten.
const JOB_HISTORY: usize = 64;

#[derive(Default)]
struct CannedState {
    jobs: Mutex<VecDeque<RemuxJob>>,
    started: AtomicUsize,
    active_processes: AtomicUsize,
    open_sources: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Remuxer that emits a fixed chunk sequence per job.
pub struct CannedRemuxer {
    chunks: Vec<Bytes>,
    pace: Option<Duration>,
    repeat: bool,
    fail_after: Option<usize>,
    fail_on_start: bool,
    state: Arc<CannedState>,
}

impl CannedRemuxer {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            pace: None,
            repeat: false,
            fail_after: None,
            fail_on_start: false,
            state: Arc::new(CannedState::default()),
        }
    }

    /// Endless paced output resembling a real remux.
    pub fn demo() -> Self {
        let payload = Bytes::from(vec![0u8; 16 * 1024]);
        Self::new([Bytes::from_static(DEMO_HEADER), payload])
            .paced(Duration::from_millis(50))
            .repeating()
    }

    /// Waits `interval` before every chunk.
    pub fn paced(mut self, interval: Duration) -> Self {
        self.pace = Some(interval);
        self
    }

    /// Cycles through the chunks until the stream is dropped.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Emits `count` chunks, then a process failure.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Rejects every start as if the executable were missing.
    pub fn failing_on_start(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    /// The most recent started jobs, oldest first.
    pub fn started_jobs(&self) -> Vec<RemuxJob> {
        self.state.jobs.lock().iter().cloned().collect()
    }

    /// Every successful start, including jobs no longer in the history.
    pub fn start_count(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    /// Processes whose output stream is still alive.
    pub fn active_processes(&self) -> usize {
        self.state.active_processes.load(Ordering::SeqCst)
    }

    /// Source connections held by live processes.
    pub fn open_source_connections(&self) -> usize {
        self.state.open_sources.load(Ordering::SeqCst)
    }

    /// Processes dropped before their output ended.
    pub fn cancelled_jobs(&self) -> usize {
        self.state.cancelled.load(Ordering::SeqCst)
    }
}

/// Holds one process slot and both source connections while alive.
struct ProcessLease {
    state: Arc<CannedState>,
    finished: bool,
}

impl ProcessLease {
    fn acquire(state: Arc<CannedState>) -> Self {
        state.active_processes.fetch_add(1, Ordering::SeqCst);
        state.open_sources.fetch_add(2, Ordering::SeqCst);
        Self {
            state,
            finished: false,
        }
    }

    /// Marks the output as complete so the release is not a cancellation.
    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for ProcessLease {
    fn drop(&mut self) {
        if !self.finished {
            self.state.cancelled.fetch_add(1, Ordering::SeqCst);
        }
        self.state.open_sources.fetch_sub(2, Ordering::SeqCst);
        self.state.active_processes.fetch_sub(1, Ordering::SeqCst);
    }
}

struct CannedProcess {
    chunks: Vec<Bytes>,
    position: usize,
    emitted: usize,
    pace: Option<Duration>,
    repeat: bool,
    fail_after: Option<usize>,
    lease: ProcessLease,
}

#[async_trait]
impl Remuxer for CannedRemuxer {
    async fn start(&self, job: &RemuxJob) -> Result<ByteStream, RemuxError> {
        if self.fail_on_start {
            return Err(RemuxError::SpawnFailed {
                reason: "canned remuxer configured to fail".to_string(),
            });
        }

        {
            let mut jobs = self.state.jobs.lock();
            if jobs.len() == JOB_HISTORY {
                jobs.pop_front();
            }
            jobs.push_back(job.clone());
        }
        self.state.started.fetch_add(1, Ordering::SeqCst);
        debug!(job = %job.id, chunks = self.chunks.len(), "Starting canned remux");

        let process = CannedProcess {
            chunks: self.chunks.clone(),
            position: 0,
            emitted: 0,
            pace: self.pace,
            repeat: self.repeat,
            fail_after: self.fail_after,
            lease: ProcessLease::acquire(Arc::clone(&self.state)),
        };

        let stream = stream::unfold(process, |mut process| async move {
            if process.lease.finished {
                return None;
            }

            if process.fail_after == Some(process.emitted) {
                process.lease.finish();
                return Some((
                    Err(RemuxError::ProcessFailed {
                        status: "exit status: 1".to_string(),
                        stderr: "canned failure".to_string(),
                    }),
                    process,
                ));
            }

            if process.position == process.chunks.len() {
                if !process.repeat || process.chunks.is_empty() {
                    process.lease.finish();
                    return None;
                }
                process.position = 0;
            }

            if let Some(pace) = process.pace {
                tokio::time::sleep(pace).await;
            }

            let chunk = process.chunks[process.position].clone();
            process.position += 1;
            process.emitted += 1;
            Some((Ok(chunk), process))
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}
