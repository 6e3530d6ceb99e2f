//! Sketch-to-mesh generation for sketchmesh
//!
//! Drives two sequential remote jobs: the enhance service turns a sketch
//! into a rendered image, the mesh service turns that image into a
//! textured 3D model. [`GenerationPipeline`] owns the job state machine and
//! the synthetic progress reporting; [`GenerationBackend`] is the seam to
//! the services ([`RemoteServices`] over HTTP, mocks in tests).

mod handle;
mod pipeline;
mod progress;
mod remote;

pub use handle::{ImageHandle, MeshHandle};
pub use pipeline::GenerationPipeline;
pub use progress::{advance_progress, status_message};
pub use remote::RemoteServices;

pub use sketchmesh_ipc::{GenerationPhase, GenerationStatus};

use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Connection failed: {0}")]
    Transport(String),

    #[error("Remote service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Cannot {operation} while {}", .phase.label())]
    State {
        operation: &'static str,
        phase: GenerationPhase,
    },

    #[error("Cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Transport and remote failures can be retried by resubmitting
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Remote { .. })
    }

    /// Short machine-readable code for UI error notifications
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Remote { .. } => "remote",
            Self::State { .. } => "state",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Request for the enhance service
#[derive(Debug, Clone)]
pub struct EnhanceRequest {
    /// Encoded sketch (PNG)
    pub sketch: ImageHandle,
    /// Trimmed, non-empty prompt
    pub prompt: String,
    /// Trimmed negative prompt; None when blank
    pub negative_prompt: Option<String>,
}

/// The two remote jobs
///
/// Futures must be `Send` so a pipeline run can be spawned onto the runtime
/// while the drawing surface stays responsive.
pub trait GenerationBackend: Send + Sync + 'static {
    /// Stylize a sketch into a rendered image
    fn enhance(
        &self,
        request: EnhanceRequest,
    ) -> impl Future<Output = Result<ImageHandle, GenerationError>> + Send;

    /// Convert a rendered image into a mesh asset
    fn meshify(
        &self,
        image: ImageHandle,
    ) -> impl Future<Output = Result<MeshHandle, GenerationError>> + Send;
}
