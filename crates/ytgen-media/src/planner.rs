//! Size-tiered transcription planner.
//!
//! Pure decision function over file size: small files are transcribed
//! directly, mid-size files get their audio extracted first, oversize files
//! are rejected up front.

use serde::{Deserialize, Serialize};

/// Chosen transcription strategy for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionPlan {
    /// Send the file to the transcription service as-is
    Direct,
    /// Extract and compress the audio stream first
    ExtractAudio,
    /// File exceeds the supported ceiling; fail fast
    Unsupported,
}

/// Size thresholds for the planner, in megabytes.
#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    /// Files below this go straight to transcription
    pub direct_limit_mb: u64,
    /// Files at or above this are unsupported
    pub max_size_mb: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            direct_limit_mb: 25,
            max_size_mb: 100,
        }
    }
}

impl PlannerConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            direct_limit_mb: std::env::var("TRANSCRIBE_DIRECT_LIMIT_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.direct_limit_mb),
            max_size_mb: std::env::var("TRANSCRIBE_MAX_SIZE_MB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size_mb),
        }
    }
}

/// Select the transcription tier for a file of `size_bytes`.
pub fn plan_transcription(size_bytes: u64, config: &PlannerConfig) -> TranscriptionPlan {
    let direct_limit = config.direct_limit_mb * 1024 * 1024;
    let max_size = config.max_size_mb * 1024 * 1024;

    if size_bytes < direct_limit {
        TranscriptionPlan::Direct
    } else if size_bytes < max_size {
        TranscriptionPlan::ExtractAudio
    } else {
        TranscriptionPlan::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_tier_boundaries() {
        let config = PlannerConfig::default();

        assert_eq!(plan_transcription(0, &config), TranscriptionPlan::Direct);
        assert_eq!(plan_transcription(25 * MB - 1, &config), TranscriptionPlan::Direct);
        // T1 is inclusive on the extract side
        assert_eq!(plan_transcription(25 * MB, &config), TranscriptionPlan::ExtractAudio);
        assert_eq!(plan_transcription(40 * MB, &config), TranscriptionPlan::ExtractAudio);
        assert_eq!(plan_transcription(100 * MB - 1, &config), TranscriptionPlan::ExtractAudio);
        // T2 is inclusive on the unsupported side
        assert_eq!(plan_transcription(100 * MB, &config), TranscriptionPlan::Unsupported);
        assert_eq!(plan_transcription(500 * MB, &config), TranscriptionPlan::Unsupported);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = PlannerConfig {
            direct_limit_mb: 10,
            max_size_mb: 20,
        };
        assert_eq!(plan_transcription(9 * MB, &config), TranscriptionPlan::Direct);
        assert_eq!(plan_transcription(15 * MB, &config), TranscriptionPlan::ExtractAudio);
        assert_eq!(plan_transcription(20 * MB, &config), TranscriptionPlan::Unsupported);
    }
}
