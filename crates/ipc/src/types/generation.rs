//! Generation job phase and status.

use serde::{Deserialize, Serialize};

/// Phase of the two-stage generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationPhase {
    #[default]
    Idle,
    EnhanceInFlight,
    EnhanceDone,
    MeshInFlight,
    MeshDone,
    Errored,
}

impl GenerationPhase {
    /// True while a remote call is outstanding
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::EnhanceInFlight | Self::MeshInFlight)
    }

    /// Human-readable label for logs and the status line
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::EnhanceInFlight => "enhancing",
            Self::EnhanceDone => "enhanced",
            Self::MeshInFlight => "building mesh",
            Self::MeshDone => "mesh ready",
            Self::Errored => "failed",
        }
    }
}

/// Snapshot of the pipeline reported to the UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationStatus {
    /// Job epoch; bumps on every submission and reset
    pub epoch: u64,
    pub phase: GenerationPhase,
    /// Progress percentage, 0-100
    pub progress: u8,
    /// Status line shown next to the progress bar
    pub message: String,
    /// Failure description when `phase` is `Errored`
    pub error: Option<String>,
}
