//! End-to-end remux pipeline tests: plan a request, merge the pair, consume
//! or abandon the output.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tubemux_core::catalog::{AudioQualityTier, StreamDescriptor};
use tubemux_core::config::{RemuxConfig, SelectionConfig};
use tubemux_core::remux::{CannedRemuxer, RemuxError, RemuxOrchestrator, Remuxer};
use tubemux_core::request::{DownloadPlan, plan_download};
use tubemux_core::{SelectionError, SourceMetadata};

fn scenario_metadata() -> SourceMetadata {
    SourceMetadata::new(
        "Scenario",
        vec![
            StreamDescriptor::video("https://video.example.com/720?sig=a", "720p")
                .with_format_id("136")
                .with_frame_rate(30)
                .with_bitrate(1000),
            StreamDescriptor::audio("https://audio.example.com/opus?sig=b")
                .with_format_id("251")
                .with_tier(AudioQualityTier::High)
                .with_codec("opus")
                .with_bitrate(128),
        ],
    )
}

#[tokio::test]
async fn test_selected_pair_reaches_remuxer() {
    let metadata = scenario_metadata();
    let plan = match plan_download(&metadata, Some("720p"), &SelectionConfig::default()).unwrap() {
        DownloadPlan::Stream(plan) => plan,
        DownloadPlan::Info(_) => panic!("expected a stream plan"),
    };

    let remuxer = Arc::new(CannedRemuxer::new([&b"ftyp"[..], &b"moof"[..]]));
    let orchestrator =
        RemuxOrchestrator::new(Arc::clone(&remuxer) as Arc<dyn Remuxer>, &RemuxConfig::default());

    let output: Vec<Bytes> = orchestrator
        .merge(Some(&plan.video), Some(&plan.audio))
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(output.concat(), b"ftypmoof");

    let jobs = remuxer.started_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].video, "https://video.example.com/720?sig=a");
    assert_eq!(jobs[0].audio, "https://audio.example.com/opus?sig=b");
}

#[tokio::test]
async fn test_unavailable_quality_never_reaches_remuxer() {
    let metadata = scenario_metadata();
    let result = plan_download(&metadata, Some("1080p"), &SelectionConfig::default());
    assert!(matches!(
        result,
        Err(SelectionError::QualityUnavailable { ref requested, .. }) if requested == "1080p"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_releases_process_and_sources() {
    let metadata = scenario_metadata();
    let catalog = metadata.catalog();

    let remuxer = Arc::new(
        CannedRemuxer::new([&b"moof"[..]])
            .paced(Duration::from_millis(100))
            .repeating(),
    );
    let orchestrator =
        RemuxOrchestrator::new(Arc::clone(&remuxer) as Arc<dyn Remuxer>, &RemuxConfig::default());

    let mut stream = orchestrator
        .merge(catalog.video_only().first(), catalog.audio_only().first())
        .await
        .unwrap();

    // Two seconds of output
    for _ in 0..20 {
        assert!(stream.next().await.unwrap().is_ok());
    }
    assert_eq!(remuxer.active_processes(), 1);
    assert_eq!(remuxer.open_source_connections(), 2);

    drop(stream);

    assert_eq!(remuxer.active_processes(), 0);
    assert_eq!(remuxer.open_source_connections(), 0);
    assert_eq!(remuxer.cancelled_jobs(), 1);
    assert_eq!(remuxer.start_count(), 1);
}

#[tokio::test]
async fn test_start_failure_surfaces_before_any_output() {
    let metadata = scenario_metadata();
    let catalog = metadata.catalog();
    let remuxer = Arc::new(CannedRemuxer::new(Vec::<Bytes>::new()).failing_on_start());
    let orchestrator = RemuxOrchestrator::new(remuxer, &RemuxConfig::default());

    let result = orchestrator
        .merge(catalog.video_only().first(), catalog.audio_only().first())
        .await;
    assert!(matches!(result, Err(RemuxError::SpawnFailed { .. })));
}

#[cfg(target_os = "linux")]
mod ffmpeg_stub {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use tubemux_core::remux::FfmpegRemuxer;

    use super::*;

    /// Writes an executable stand-in for ffmpeg that records its pid and
    /// arguments before running `body`.
    fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let pid_file = dir.join(format!("{name}.pid"));
        let args_file = dir.join(format!("{name}.args"));
        let script = format!(
            "#!/bin/sh\necho $$ > '{}'\nprintf '%s\\n' \"$@\" > '{}'\n{}\n",
            pid_file.display(),
            args_file.display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn read_pid(dir: &Path, name: &str) -> u32 {
        std::fs::read_to_string(dir.join(format!("{name}.pid")))
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    /// True once the process is gone or only a zombie awaiting reaping.
    fn is_terminated(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .is_some_and(|state| state == 'Z' || state == 'X'),
        }
    }

    fn pair() -> (StreamDescriptor, StreamDescriptor) {
        (
            StreamDescriptor::video("https://video.example.invalid/v?sig=a", "720p"),
            StreamDescriptor::audio("https://audio.example.invalid/a?sig=b"),
        )
    }

    // Stubs are written before anything is spawned, avoiding ETXTBSY
    #[tokio::test]
    async fn test_ffmpeg_process_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let streaming = write_stub(
            dir.path(),
            "ffmpeg-streaming",
            "while true; do printf 'moofdata'; sleep 0.05; done",
        );
        let failing = write_stub(
            dir.path(),
            "ffmpeg-failing",
            "echo 'Server returned 403 Forbidden' >&2\nexit 1",
        );
        let (video, audio) = pair();

        // Cancellation kills the process
        let config = RemuxConfig {
            ffmpeg_path: streaming,
            ..RemuxConfig::default()
        };
        let orchestrator =
            RemuxOrchestrator::new(Arc::new(FfmpegRemuxer::from_config(&config)), &config);
        let mut stream = orchestrator.merge(Some(&video), Some(&audio)).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert!(first.starts_with(b"moof"));

        let pid = read_pid(dir.path(), "ffmpeg-streaming");
        assert!(!is_terminated(pid));

        let args = std::fs::read_to_string(dir.path().join("ffmpeg-streaming.args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert!(args.contains(&"https://video.example.invalid/v?sig=a"));
        assert!(args.contains(&"https://audio.example.invalid/a?sig=b"));
        assert!(args.windows(2).any(|w| w == ["-map", "0:v:0"]));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a:0"]));
        assert_eq!(args.last(), Some(&"pipe:1"));

        drop(stream);

        let mut terminated = false;
        for _ in 0..40 {
            if is_terminated(pid) {
                terminated = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(terminated, "ffmpeg stub {pid} survived cancellation");

        // Non-zero exit surfaces as a process failure with stderr
        let config = RemuxConfig {
            ffmpeg_path: failing,
            ..RemuxConfig::default()
        };
        let orchestrator =
            RemuxOrchestrator::new(Arc::new(FfmpegRemuxer::from_config(&config)), &config);
        let mut stream = orchestrator.merge(Some(&video), Some(&audio)).await.unwrap();

        match stream.next().await {
            Some(Err(RemuxError::ProcessFailed { status, stderr })) => {
                assert!(status.contains('1'), "unexpected status {status}");
                assert!(stderr.contains("403 Forbidden"));
            }
            other => panic!("expected process failure, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }
}
