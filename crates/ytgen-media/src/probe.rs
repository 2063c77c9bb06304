//! Two-pass video metadata probe.
//!
//! The fast pass reads the container header with ffprobe and must resolve
//! even for unreadable files (degrading to empty metadata). The full pass
//! decodes the file with ffmpeg and parses the textual stream log; any
//! failure there degrades to fast-pass-only results. A probe failure is
//! never a pipeline failure.

use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, warn};

use ytgen_models::{AudioMetadata, VideoMetadata};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::engine::FfmpegEngine;
use crate::error::{MediaError, MediaResult};
use crate::frames::{self, FrameOptions};
use crate::progress::{ProbePhase, ProbeProgress};

/// Number of representative frames sampled during a full probe.
pub const FULL_PROBE_FRAME_COUNT: usize = 5;

/// Result of a probe: merged metadata plus sampled frames.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub metadata: VideoMetadata,
    /// JPEG data URLs for the sampled frames
    pub frames: Vec<String>,
}

/// FFprobe JSON output shape (fast pass).
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    format_name: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// Media prober owning an injected FFmpeg engine.
#[derive(Debug, Clone)]
pub struct MediaProber {
    engine: FfmpegEngine,
}

impl MediaProber {
    pub fn new(engine: FfmpegEngine) -> Self {
        Self { engine }
    }

    /// Probe a video: fast pass, full pass, then frame sampling.
    ///
    /// Progress is reported as a monotone fraction in [0,1]: the fast pass
    /// fills 0→0.2, the full decode 0.2→0.5, frame extraction 0.5→1.0.
    pub async fn probe<F>(&self, path: impl AsRef<Path>, on_progress: F) -> MediaResult<ProbeOutcome>
    where
        F: Fn(ProbeProgress) + Send + Sync,
    {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let fast = self.fast_probe(path).await;
        on_progress(ProbeProgress::new(ProbePhase::FastPass, 0.2));

        let full = match self.full_probe(path).await {
            Ok(meta) => meta,
            Err(e) => {
                // Degrade to fast-pass-only results
                warn!("Full probe pass failed, using fast-pass metadata: {}", e);
                VideoMetadata::default()
            }
        };
        on_progress(ProbeProgress::new(ProbePhase::FullPass, 0.5));

        let metadata = merge_metadata(&fast, &full);

        let frames = match frames::extract_frames(
            &self.engine,
            path,
            metadata.duration.unwrap_or(0.0),
            &FrameOptions::full_probe(),
            |i, total| {
                let fraction = 0.5 + 0.5 * (i as f64 / total as f64);
                on_progress(ProbeProgress::new(ProbePhase::Frames, fraction));
            },
        )
        .await
        {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Frame extraction failed, continuing without frames: {}", e);
                Vec::new()
            }
        };
        on_progress(ProbeProgress::new(ProbePhase::Frames, 1.0));

        Ok(ProbeOutcome { metadata, frames })
    }

    /// Fast pass: container header read via ffprobe.
    ///
    /// Resolves with empty metadata on any error rather than failing.
    pub async fn fast_probe(&self, path: &Path) -> VideoMetadata {
        match self.run_ffprobe(path).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!("Fast probe pass failed: {}", e);
                VideoMetadata::default()
            }
        }
    }

    async fn run_ffprobe(&self, path: &Path) -> MediaResult<VideoMetadata> {
        let output = Command::new(self.engine.ffprobe())
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::FfprobeFailed {
                message: "FFprobe failed".to_string(),
                stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
            });
        }

        let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

        let mut meta = VideoMetadata::default();
        if let Some(format) = probe.format {
            meta.duration = format.duration.as_deref().and_then(|d| d.parse().ok());
            meta.bit_rate = format.bit_rate.as_deref().and_then(|b| b.parse().ok());
            // format_name can be a comma-separated list; keep the first entry
            meta.container = format
                .format_name
                .as_deref()
                .and_then(|f| f.split(',').next())
                .map(|f| f.to_string());
        }
        if let Some(stream) = probe.streams.iter().find(|s| s.codec_type == "video") {
            meta.width = stream.width;
            meta.height = stream.height;
        }

        Ok(meta)
    }

    /// Full pass: decode the file and parse the textual stream log.
    pub async fn full_probe(&self, path: &Path) -> MediaResult<VideoMetadata> {
        let runner = FfmpegRunner::new(self.engine.clone()).with_timeout(120);
        let cmd = FfmpegCommand::decode_only(path);

        // The banner is printed even when the decode itself errors, so keep
        // whatever stderr we got.
        let log = match runner.run_capturing_stderr(&cmd).await {
            Ok(log) => log,
            Err(MediaError::FfmpegFailed { stderr: Some(log), .. }) => log,
            Err(e) => return Err(e),
        };

        debug!("Full probe log: {} bytes", log.len());
        Ok(parse_decode_log(&log))
    }
}

/// Merge fast- and full-pass metadata.
///
/// Rule: prefer the full-probe value, fall back to the fast value, fall
/// back to zero/empty (i.e. `None`).
pub fn merge_metadata(fast: &VideoMetadata, full: &VideoMetadata) -> VideoMetadata {
    VideoMetadata {
        duration: full.duration.or(fast.duration),
        width: full.width.or(fast.width),
        height: full.height.or(fast.height),
        fps: full.fps.or(fast.fps),
        bit_rate: full.bit_rate.or(fast.bit_rate),
        container: full.container.clone().or_else(|| fast.container.clone()),
        codec: full.codec.clone().or_else(|| fast.codec.clone()),
        audio: full.audio.clone().or_else(|| fast.audio.clone()),
    }
}

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2})\.(\d+)").expect("valid regex")
    })
}

fn video_stream_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Stream #[^:]*:[^:]*Video:\s*(\w+)").expect("valid regex")
    })
}

fn audio_stream_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Stream #[^:]*:[^:]*Audio:\s*(\w+)").expect("valid regex")
    })
}

fn dimensions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{2,5})x(\d{2,5})").expect("valid regex"))
}

fn fps_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*fps").expect("valid regex"))
}

fn kbps_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*kb/s").expect("valid regex"))
}

fn sample_rate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*Hz").expect("valid regex"))
}

/// Parse an FFmpeg decode log into metadata.
///
/// Pattern matching against the known log line shapes: `Duration:
/// HH:MM:SS.cc`, the first `Video:` stream descriptor and the first
/// `Audio:` stream descriptor. A missing match leaves the field `None`
/// rather than erroring.
pub fn parse_decode_log(log: &str) -> VideoMetadata {
    let mut meta = VideoMetadata::default();

    if let Some(caps) = duration_re().captures(log) {
        let hours: f64 = caps[1].parse().unwrap_or(0.0);
        let minutes: f64 = caps[2].parse().unwrap_or(0.0);
        let seconds: f64 = caps[3].parse().unwrap_or(0.0);
        let frac_str = &caps[4];
        let frac: f64 = frac_str.parse::<f64>().unwrap_or(0.0)
            / 10f64.powi(frac_str.len() as i32);
        meta.duration = Some(hours * 3600.0 + minutes * 60.0 + seconds + frac);
    }

    // First video stream descriptor
    if let Some(line) = log.lines().find(|l| video_stream_re().is_match(l)) {
        if let Some(caps) = video_stream_re().captures(line) {
            meta.codec = Some(caps[1].to_string());
        }
        if let Some(caps) = dimensions_re().captures(line) {
            meta.width = caps[1].parse().ok();
            meta.height = caps[2].parse().ok();
        }
        if let Some(caps) = fps_re().captures(line) {
            meta.fps = caps[1].parse().ok();
        }
        if let Some(caps) = kbps_re().captures(line) {
            // kb/s → bits/s
            meta.bit_rate = caps[1].parse::<u64>().ok().map(|kb| kb * 1000);
        }
    }

    // First audio stream descriptor
    if let Some(line) = log.lines().find(|l| audio_stream_re().is_match(l)) {
        let mut audio = AudioMetadata {
            codec: None,
            sample_rate: None,
            channels: None,
            bit_rate: None,
        };
        if let Some(caps) = audio_stream_re().captures(line) {
            audio.codec = Some(caps[1].to_string());
        }
        if let Some(caps) = sample_rate_re().captures(line) {
            audio.sample_rate = caps[1].parse().ok();
        }
        // "stereo" token maps to 2 channels, everything else to 1
        audio.channels = Some(if line.contains("stereo") { 2 } else { 1 });
        if let Some(caps) = kbps_re().captures(line) {
            audio.bit_rate = caps[1].parse::<u64>().ok().map(|kb| kb * 1000);
        }
        meta.audio = Some(audio);
    }

    meta
}
