//! Probe progress reporting.

use serde::{Deserialize, Serialize};

/// Phase of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbePhase {
    FastPass,
    FullPass,
    Frames,
}

impl ProbePhase {
    pub fn label(&self) -> &'static str {
        match self {
            ProbePhase::FastPass => "Reading container metadata",
            ProbePhase::FullPass => "Analyzing streams",
            ProbePhase::Frames => "Extracting frames",
        }
    }
}

/// A probe progress report: a monotone fraction in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeProgress {
    pub phase: ProbePhase,
    pub fraction: f64,
}

impl ProbeProgress {
    pub fn new(phase: ProbePhase, fraction: f64) -> Self {
        Self {
            phase,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }
}
