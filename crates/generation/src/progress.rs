//! Synthetic progress
//!
//! The remote calls are single opaque requests, so progress is simulated: a
//! ticker adds a random step each interval, capped below completion until
//! the real response arrives.

use sketchmesh_ipc::GenerationPhase;

/// Next progress value: never decreases and never passes `cap`
pub fn advance_progress(current: u8, step: u32, cap: u32) -> u8 {
    let cap = cap.min(100);
    if current as u32 >= cap {
        return current;
    }
    (current as u32).saturating_add(step).min(cap) as u8
}

/// Status line for a phase at a given progress
///
/// Thresholds are cosmetic; the result only depends on the inputs.
pub fn status_message(phase: GenerationPhase, progress: u8) -> &'static str {
    match phase {
        GenerationPhase::Idle => "Waiting for a sketch",
        GenerationPhase::EnhanceInFlight => match progress {
            0..20 => "Uploading sketch",
            20..50 => "Interpreting strokes",
            50..80 => "Rendering image",
            _ => "Adding final details",
        },
        GenerationPhase::EnhanceDone => "Image ready",
        GenerationPhase::MeshInFlight => match progress {
            0..25 => "Analyzing image",
            25..50 => "Estimating depth",
            50..75 => "Building geometry",
            _ => "Texturing mesh",
        },
        GenerationPhase::MeshDone => "Model ready",
        GenerationPhase::Errored => "Generation failed",
    }
}
