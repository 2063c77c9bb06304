//! Representative frame sampling.
//!
//! Frames are sampled at equally spaced fractions strictly inside (0,1),
//! decoded one at a time, scaled to a fixed width and returned as JPEG
//! data URLs.

use base64::Engine as _;
use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::engine::FfmpegEngine;
use crate::error::MediaResult;

/// Frame extraction options.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    /// Number of frames to sample
    pub count: usize,
    /// Scaled output width in pixels
    pub width: u32,
}

impl FrameOptions {
    /// Five frames for a full metadata probe.
    pub fn full_probe() -> Self {
        Self { count: 5, width: 320 }
    }

    /// Single quick thumbnail.
    pub fn quick_thumbnail() -> Self {
        Self { count: 1, width: 320 }
    }

    /// Three thumbnail candidates.
    pub fn thumbnail_candidates() -> Self {
        Self { count: 3, width: 640 }
    }
}

/// Sample `count` fractions strictly inside (0,1): i/(count+1) for i=1..count.
///
/// The result is monotonically increasing and symmetric around 0.5.
pub fn sample_fractions(count: usize) -> Vec<f64> {
    (1..=count).map(|i| i as f64 / (count + 1) as f64).collect()
}

/// Extract frames at sampled timestamps and encode them as data URLs.
///
/// `on_frame(i, total)` is called after each frame completes so the caller
/// can apportion progress evenly.
pub async fn extract_frames<F>(
    engine: &FfmpegEngine,
    path: impl AsRef<Path>,
    duration_secs: f64,
    options: &FrameOptions,
    on_frame: F,
) -> MediaResult<Vec<String>>
where
    F: Fn(usize, usize),
{
    let path = path.as_ref();
    let runner = FfmpegRunner::new(engine.clone()).with_timeout(60);
    let fractions = sample_fractions(options.count);

    let tmp = tempfile::tempdir()?;
    let mut frames = Vec::with_capacity(options.count);

    for (i, fraction) in fractions.iter().enumerate() {
        let timestamp = fraction * duration_secs;
        let out_path = tmp.path().join(format!("frame_{i}.jpg"));

        let cmd = FfmpegCommand::new(path, &out_path)
            .seek(timestamp)
            .single_frame()
            .video_filter(format!("scale={}:-2", options.width));
        runner.run(&cmd).await?;

        let bytes = tokio::fs::read(&out_path).await?;
        debug!("Extracted frame {} at {:.2}s ({} bytes)", i, timestamp, bytes.len());
        frames.push(to_data_url(&bytes));

        on_frame(i + 1, options.count);
    }

    Ok(frames)
}

/// Encode JPEG bytes as a data URL.
fn to_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_fractions_count_and_bounds() {
        for n in 1..=10 {
            let fractions = sample_fractions(n);
            assert_eq!(fractions.len(), n);
            for f in &fractions {
                assert!(*f > 0.0 && *f < 1.0);
            }
        }
    }

    #[test]
    fn test_sample_fractions_monotone() {
        let fractions = sample_fractions(5);
        for pair in fractions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_sample_fractions_symmetric_around_half() {
        for n in 1..=8 {
            let fractions = sample_fractions(n);
            for (a, b) in fractions.iter().zip(fractions.iter().rev()) {
                assert!((a + b - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_single_frame_is_midpoint() {
        assert_eq!(sample_fractions(1), vec![0.5]);
    }

    #[test]
    fn test_data_url_prefix() {
        let url = to_data_url(&[0xFF, 0xD8, 0xFF]);
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
