//! Dependency-free PCM compressor.
//!
//! Shrinks audio before upload when only speech fidelity matters: linear
//! resample to a target rate, optional mono downmix, and a minimal
//! uncompressed RIFF/WAVE container. Output size is exactly
//! `sample_rate * 2 * channels * duration` plus the 44-byte header, with no
//! lossy codec involved.

/// Options for PCM compression.
#[derive(Debug, Clone, Copy)]
pub struct WavOptions {
    /// Target sample rate in Hz
    pub target_rate: u32,
    /// Downmix to a single channel
    pub mono: bool,
}

impl Default for WavOptions {
    fn default() -> Self {
        Self {
            target_rate: 16_000,
            mono: true,
        }
    }
}

/// Compress interleaved f32 PCM samples into a 16-bit WAV file.
///
/// `samples` is interleaved with `channels` channels at `src_rate` Hz.
pub fn compress_pcm(samples: &[f32], src_rate: u32, channels: u32, options: &WavOptions) -> Vec<u8> {
    let channels = channels.max(1);

    // Deinterleave, optionally downmixing to mono by averaging
    let planes: Vec<Vec<f32>> = if options.mono && channels > 1 {
        let mut mixed = Vec::with_capacity(samples.len() / channels as usize);
        for frame in samples.chunks_exact(channels as usize) {
            mixed.push(frame.iter().sum::<f32>() / channels as f32);
        }
        vec![mixed]
    } else {
        let mut planes = vec![Vec::with_capacity(samples.len() / channels as usize); channels as usize];
        for frame in samples.chunks_exact(channels as usize) {
            for (plane, sample) in planes.iter_mut().zip(frame) {
                plane.push(*sample);
            }
        }
        planes
    };

    let resampled: Vec<Vec<f32>> = planes
        .iter()
        .map(|plane| resample_linear(plane, src_rate, options.target_rate))
        .collect();

    let out_channels = resampled.len() as u16;
    let frame_count = resampled.first().map(|p| p.len()).unwrap_or(0);

    // Interleave back and quantize to i16
    let mut pcm = Vec::with_capacity(frame_count * out_channels as usize * 2);
    for i in 0..frame_count {
        for plane in &resampled {
            let sample = (plane[i].clamp(-1.0, 1.0) * 32767.0) as i16;
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
    }

    write_wav(&pcm, options.target_rate, out_channels)
}

/// Linear-interpolation resampler.
fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx];
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }

    out
}

/// Wrap 16-bit little-endian PCM data in a RIFF/WAVE header.
fn write_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bytes_per_sample: u16 = 2;
    let block_align = channels * bytes_per_sample;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = pcm.len() as u32;

    let mut out = Vec::with_capacity(44 + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(bytes_per_sample * 8).to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header() {
        let samples = vec![0.0f32; 16_000]; // one second mono at 16kHz
        let wav = compress_pcm(&samples, 16_000, 1, &WavOptions::default());

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        // Output size: 44-byte header + rate * 2 bytes * 1 channel * 1s
        assert_eq!(wav.len(), 44 + 16_000 * 2);
    }

    #[test]
    fn test_downsample_halves_output() {
        let samples = vec![0.5f32; 32_000]; // one second mono at 32kHz
        let wav = compress_pcm(
            &samples,
            32_000,
            1,
            &WavOptions {
                target_rate: 16_000,
                mono: true,
            },
        );
        // One second at 16kHz, 16-bit mono
        assert_eq!(wav.len(), 44 + 16_000 * 2);
    }

    #[test]
    fn test_stereo_downmix_averages() {
        // Left = 1.0, right = 0.0 → mixed 0.5
        let samples: Vec<f32> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let wav = compress_pcm(
            &samples,
            16_000,
            2,
            &WavOptions {
                target_rate: 16_000,
                mono: true,
            },
        );

        let sample = i16::from_le_bytes([wav[44], wav[45]]);
        assert!((sample as f32 / 32767.0 - 0.5).abs() < 0.01);
        // 100 frames mono
        assert_eq!(wav.len(), 44 + 100 * 2);
    }

    #[test]
    fn test_stereo_preserved_when_not_mono() {
        let samples = vec![0.0f32; 400]; // 200 stereo frames
        let wav = compress_pcm(
            &samples,
            16_000,
            2,
            &WavOptions {
                target_rate: 16_000,
                mono: false,
            },
        );
        // Channel count field
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(wav.len(), 44 + 400 * 2);
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }
}
