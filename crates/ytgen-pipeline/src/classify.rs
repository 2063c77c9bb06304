//! Error classification and recovery policy.
//!
//! Failures from every pipeline boundary are mapped to a typed error with
//! a recoverability flag by pattern matching the error's message text
//! against an ordered list of rules; the first match wins. More specific
//! rules (size-limit with a parsed MB value) come before generic ones.
//!
//! The matching strategy lives entirely behind `classify` so it can later
//! be replaced by typed error propagation from the services themselves.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Ceiling of the unsupported tier in MB. A size failure at or above this
/// cannot be fixed by retrying.
const SIZE_CEILING_MB: u64 = 100;

/// Kind of a classified pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Upload,
    SizeLimit,
    Format,
    Transcription,
    Generation,
    Metadata,
    AudioExtraction,
    Authorization,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Upload => "upload",
            ErrorKind::SizeLimit => "size_limit",
            ErrorKind::Format => "format",
            ErrorKind::Transcription => "transcription",
            ErrorKind::Generation => "generation",
            ErrorKind::Metadata => "metadata",
            ErrorKind::AudioExtraction => "audio_extraction",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Default recoverability per kind. Size-limit is handled separately:
    /// its recoverability depends on the parsed size.
    fn default_recoverable(&self) -> bool {
        match self {
            ErrorKind::Network => true,
            ErrorKind::Upload => true,
            ErrorKind::SizeLimit => false,
            ErrorKind::Format => false,
            ErrorKind::Transcription => true,
            ErrorKind::Generation => true,
            ErrorKind::Metadata => true,
            ErrorKind::AudioExtraction => false,
            ErrorKind::Authorization => false,
            ErrorKind::Unknown => true,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified pipeline failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// User-facing message
    pub message: String,
    /// The original error text
    pub detail: String,
    /// Whether a user-initiated retry can succeed
    pub recoverable: bool,
    /// Suggested remedial action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

struct Rule {
    kind: ErrorKind,
    needles: &'static [&'static str],
    message: &'static str,
    action: Option<&'static str>,
}

/// Ordered rules, evaluated first-match-wins. Size-limit is checked before
/// this table because it needs the MB parse.
const RULES: &[Rule] = &[
    Rule {
        kind: ErrorKind::AudioExtraction,
        needles: &["audio extraction", "extract audio", "no audio stream"],
        message: "Could not extract audio from this video",
        action: Some("The file may be corrupt or use an unsupported codec. Try re-exporting the video."),
    },
    Rule {
        kind: ErrorKind::Format,
        needles: &["unsupported format", "invalid video", "codec", "demux", "moov atom"],
        message: "This video format is not supported",
        action: Some("Convert the video to MP4 (H.264) and upload again."),
    },
    Rule {
        kind: ErrorKind::Authorization,
        needles: &["unauthorized", "permission denied", "not authenticated", "forbidden", "does not belong"],
        message: "You do not have access to this resource",
        action: Some("Sign in again and retry."),
    },
    Rule {
        kind: ErrorKind::Upload,
        needles: &["upload"],
        message: "Upload failed",
        action: Some("Check your connection and upload again."),
    },
    Rule {
        kind: ErrorKind::Transcription,
        needles: &["transcription", "transcribe", "whisper"],
        message: "Transcription failed",
        action: Some("Retry transcription, or paste a transcript manually."),
    },
    Rule {
        kind: ErrorKind::Generation,
        needles: &["thumbnail", "generation failed", "image edit", "model", "gemini"],
        message: "Content generation failed",
        action: Some("Try generating again."),
    },
    Rule {
        kind: ErrorKind::Metadata,
        needles: &["metadata", "probe", "ffprobe", "duration"],
        message: "Could not read video metadata",
        action: None,
    },
    Rule {
        kind: ErrorKind::Network,
        needles: &["network", "fetch", "connection", "timed out", "timeout", "dns", "socket"],
        message: "A network error occurred",
        action: Some("Check your connection and retry."),
    },
];

fn size_mb_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*MB").expect("valid regex"))
}

/// Classify an error message into a typed, recoverability-flagged error.
pub fn classify(message: &str) -> ClassifiedError {
    let lower = message.to_lowercase();

    // Size-limit first: it is the most specific category and the only one
    // whose recoverability is per-instance.
    if lower.contains("size") || lower.contains("too large") {
        let parsed_mb = size_mb_re()
            .captures(message)
            .and_then(|caps| caps[1].parse::<u64>().ok());
        // Within the ceiling a retry can work; at or past it the file
        // itself is the problem. No parse means we cannot prove the file
        // fits, so treat it as final too.
        let recoverable = parsed_mb.is_some_and(|mb| mb <= SIZE_CEILING_MB);
        return ClassifiedError {
            kind: ErrorKind::SizeLimit,
            message: "The file exceeds the size limit".to_string(),
            detail: message.to_string(),
            recoverable,
            suggested_action: Some(format!(
                "Upload a file smaller than {}MB, or paste a transcript manually.",
                SIZE_CEILING_MB
            )),
        };
    }

    for rule in RULES {
        if rule.needles.iter().any(|needle| lower.contains(needle)) {
            return ClassifiedError {
                kind: rule.kind,
                message: rule.message.to_string(),
                detail: message.to_string(),
                recoverable: rule.kind.default_recoverable(),
                suggested_action: rule.action.map(String::from),
            };
        }
    }

    // Fallthrough: generic, recoverable
    ClassifiedError {
        kind: ErrorKind::Unknown,
        message: "Something went wrong".to_string(),
        detail: message.to_string(),
        recoverable: true,
        suggested_action: Some("Please retry.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_over_ceiling_is_final() {
        let classified = classify("Request failed: Maximum size 150MB");
        assert_eq!(classified.kind, ErrorKind::SizeLimit);
        assert!(!classified.recoverable);
    }

    #[test]
    fn test_size_limit_within_ceiling_is_recoverable() {
        let classified = classify("File size 80MB exceeds the direct tier");
        assert_eq!(classified.kind, ErrorKind::SizeLimit);
        assert!(classified.recoverable);
    }

    #[test]
    fn test_size_without_number_is_final() {
        let classified = classify("file too large");
        assert_eq!(classified.kind, ErrorKind::SizeLimit);
        assert!(!classified.recoverable);
    }

    #[test]
    fn test_network_is_recoverable() {
        let classified = classify("fetch failed");
        assert_eq!(classified.kind, ErrorKind::Network);
        assert!(classified.recoverable);
    }

    #[test]
    fn test_audio_extraction_is_final() {
        let classified = classify("Audio extraction failed: no audio stream");
        assert_eq!(classified.kind, ErrorKind::AudioExtraction);
        assert!(!classified.recoverable);
    }

    #[test]
    fn test_authorization_is_final() {
        let classified = classify("Permission denied: asset abc does not belong to the current user");
        assert_eq!(classified.kind, ErrorKind::Authorization);
        assert!(!classified.recoverable);
    }

    #[test]
    fn test_specific_beats_generic() {
        // Mentions both a size and a network-ish word; size wins because it
        // is checked first
        let classified = classify("network request rejected: size 200MB");
        assert_eq!(classified.kind, ErrorKind::SizeLimit);
    }

    #[test]
    fn test_fallthrough_is_generic_recoverable() {
        let classified = classify("something inexplicable");
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert!(classified.recoverable);
        assert!(classified.suggested_action.is_some());
    }

    #[test]
    fn test_detail_preserves_original_message() {
        let classified = classify("Transcription failed: quota exhausted");
        assert_eq!(classified.kind, ErrorKind::Transcription);
        assert_eq!(classified.detail, "Transcription failed: quota exhausted");
    }
}
