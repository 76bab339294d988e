//! FFmpeg-backed remuxer producing fragmented MP4 on stdout.
//!
//! Both inputs are opened by ffmpeg itself over the network. Video is copied
//! bit-exact, audio is transcoded to the configured codec, and the output
//! uses an empty moov with per-keyframe fragments so the first bytes are
//! playable before the input is fully read.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ByteStream, RemuxError, RemuxJob, Remuxer};
use crate::config::RemuxConfig;

/// Lines of ffmpeg stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Wait for the stderr reader after ffmpeg exits.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Encoding options for one remux process.
#[derive(Debug, Clone)]
pub struct RemuxingOptions {
    /// Target audio codec passed as `-c:a`
    pub audio_codec: String,
    /// Target audio bitrate passed as `-b:a`
    pub audio_bitrate: Option<String>,
    /// Network read/write timeout per input
    pub source_io_timeout: Duration,
    /// Read size for stdout chunks
    pub chunk_size: usize,
}

impl Default for RemuxingOptions {
    fn default() -> Self {
        Self::from(&RemuxConfig::default())
    }
}

impl From<&RemuxConfig> for RemuxingOptions {
    fn from(config: &RemuxConfig) -> Self {
        Self {
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            source_io_timeout: config.source_io_timeout,
            chunk_size: config.chunk_size.max(1),
        }
    }
}

/// Remuxer that runs one ffmpeg subprocess per job.
pub struct FfmpegRemuxer {
    program: PathBuf,
    options: RemuxingOptions,
}

impl FfmpegRemuxer {
    pub fn new(program: impl Into<PathBuf>, options: RemuxingOptions) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    pub fn from_config(config: &RemuxConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), RemuxingOptions::from(config))
    }

    /// Builds the ffmpeg command line for `job`.
    ///
    /// Input 0 contributes its first video stream, input 1 its first audio
    /// stream. `-rw_timeout` bounds every network read so a silent source
    /// makes ffmpeg exit instead of hanging.
    pub fn build_ffmpeg_args(&self, job: &RemuxJob) -> Vec<String> {
        let rw_timeout = self.options.source_io_timeout.as_micros().to_string();

        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-rw_timeout".to_string(),
            rw_timeout.clone(),
            "-i".to_string(),
            job.video.clone(),
            "-rw_timeout".to_string(),
            rw_timeout,
            "-i".to_string(),
            job.audio.clone(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            self.options.audio_codec.clone(),
        ];

        if let Some(bitrate) = &self.options.audio_bitrate {
            args.push("-b:a".to_string());
            args.push(bitrate.clone());
        }

        args.extend([
            "-movflags".to_string(),
            "frag_keyframe+empty_moov+default_base_moof".to_string(),
            "-f".to_string(),
            "mp4".to_string(),
            "pipe:1".to_string(),
        ]);

        args
    }

    fn spawn_ffmpeg(&self, job: &RemuxJob) -> Result<Child, RemuxError> {
        Command::new(&self.program)
            .args(self.build_ffmpeg_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RemuxError::SpawnFailed {
                reason: format!("{}: {e}", self.program.display()),
            })
    }

    /// Drains stderr so ffmpeg never blocks on a full pipe.
    fn spawn_stderr_reader(
        job_id: Uuid,
        stderr: ChildStderr,
        tail: Arc<Mutex<VecDeque<String>>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                warn!(job = %job_id, "FFmpeg stderr: {}", line);

                let mut tail = tail.lock();
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line.to_string());
            }
        })
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn start(&self, job: &RemuxJob) -> Result<ByteStream, RemuxError> {
        let mut child = self.spawn_ffmpeg(job)?;
        debug!(job = %job.id, pid = ?child.id(), "Spawned ffmpeg");

        let stdout = child.stdout.take().ok_or_else(|| RemuxError::SpawnFailed {
            reason: "ffmpeg stdout not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RemuxError::SpawnFailed {
            reason: "ffmpeg stderr not captured".to_string(),
        })?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_task = Self::spawn_stderr_reader(job.id, stderr, Arc::clone(&stderr_tail));

        let process = FfmpegProcess {
            job_id: job.id,
            child,
            stdout,
            stderr_tail,
            stderr_task,
            chunk_size: self.options.chunk_size,
            finished: false,
        };

        let stream = stream::unfold(process, |mut process| async move {
            if process.finished {
                return None;
            }

            let mut buffer = vec![0u8; process.chunk_size];
            match process.stdout.read(&mut buffer).await {
                Ok(0) => match process.exit().await {
                    Ok(()) => None,
                    Err(e) => Some((Err(e), process)),
                },
                Ok(n) => {
                    buffer.truncate(n);
                    Some((Ok(Bytes::from(buffer)), process))
                }
                Err(e) => {
                    process.finished = true;
                    Some((Err(RemuxError::Io(e)), process))
                }
            }
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Running ffmpeg child owned by its output stream.
struct FfmpegProcess {
    job_id: Uuid,
    child: Child,
    stdout: ChildStdout,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_task: JoinHandle<()>,
    chunk_size: usize,
    finished: bool,
}

impl FfmpegProcess {
    /// Reaps the child after stdout EOF and reports a non-zero exit.
    async fn exit(&mut self) -> Result<(), RemuxError> {
        self.finished = true;
        let status = self.child.wait().await?;

        if tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut self.stderr_task)
            .await
            .is_err()
        {
            debug!(job = %self.job_id, "ffmpeg stderr still open after exit");
        }

        if status.success() {
            debug!(job = %self.job_id, "ffmpeg exited cleanly");
            return Ok(());
        }

        let stderr = self
            .stderr_tail
            .lock()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        Err(RemuxError::ProcessFailed {
            status: status.to_string(),
            stderr,
        })
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if !self.finished {
            debug!(job = %self.job_id, "Killing ffmpeg before completion");
            if let Err(e) = self.child.start_kill() {
                debug!(job = %self.job_id, "ffmpeg already gone: {}", e);
            }
        }
        self.stderr_task.abort();
    }
}
