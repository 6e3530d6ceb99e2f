//! Generation job state machine
//!
//! `Idle -> EnhanceInFlight -> EnhanceDone -> MeshInFlight -> MeshDone`, with
//! `Errored` reachable from either in-flight phase and `reset()` returning
//! to `Idle` from anywhere. Every submission and reset bumps an epoch; a
//! response is only applied if its epoch is still current.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sketchmesh_config::ProgressConfig;
use sketchmesh_ipc::{GenerationPhase, GenerationStatus};
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handle::{ImageHandle, MeshHandle};
use crate::progress::{advance_progress, status_message};
use crate::{EnhanceRequest, GenerationBackend, GenerationError};

#[derive(Default)]
struct JobState {
    epoch: u64,
    phase: GenerationPhase,
    progress: u8,
    sketch: Option<ImageHandle>,
    enhanced: Option<ImageHandle>,
    mesh: Option<MeshHandle>,
    error: Option<String>,
    /// Cancels the ticker and the pending call of the in-flight phase
    in_flight: Option<CancellationToken>,
}

impl JobState {
    fn status(&self) -> GenerationStatus {
        GenerationStatus {
            epoch: self.epoch,
            phase: self.phase,
            progress: self.progress,
            message: status_message(self.phase, self.progress).to_string(),
            error: self.error.clone(),
        }
    }
}

/// State shared between the pipeline handles and the progress tickers
struct Shared {
    state: Mutex<JobState>,
    status_tx: watch::Sender<GenerationStatus>,
}

impl Shared {
    fn publish(&self, state: &JobState) {
        self.status_tx.send_replace(state.status());
    }

    /// Apply one progress tick. Returns false once the ticker should stop.
    fn tick(&self, epoch: u64, step: u32, cap: u32) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch || !state.phase.is_in_flight() {
            return false;
        }
        state.progress = advance_progress(state.progress, step, cap);
        self.publish(&state);
        true
    }
}

/// Two-stage generation job runner
///
/// Cloning yields another handle to the same job, so a run can be spawned
/// while the UI keeps a handle for `reset()` and status queries.
pub struct GenerationPipeline<B> {
    backend: Arc<B>,
    shared: Arc<Shared>,
    progress: ProgressConfig,
}

impl<B> Clone for GenerationPipeline<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            shared: Arc::clone(&self.shared),
            progress: self.progress.clone(),
        }
    }
}

impl<B: GenerationBackend> GenerationPipeline<B> {
    pub fn new(backend: B, progress: ProgressConfig) -> Self {
        let state = JobState::default();
        let (status_tx, _) = watch::channel(state.status());
        Self {
            backend: Arc::new(backend),
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                status_tx,
            }),
            progress,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current phase, progress and status line
    pub fn status(&self) -> GenerationStatus {
        self.shared.state.lock().status()
    }

    pub fn phase(&self) -> GenerationPhase {
        self.shared.state.lock().phase
    }

    pub fn progress(&self) -> u8 {
        self.shared.state.lock().progress
    }

    /// Sketch submitted by the current job
    pub fn sketch(&self) -> Option<ImageHandle> {
        self.shared.state.lock().sketch.clone()
    }

    /// Enhanced image, once the enhance job succeeded
    pub fn enhanced_image(&self) -> Option<ImageHandle> {
        self.shared.state.lock().enhanced.clone()
    }

    /// Mesh handle for the viewer, once the mesh job succeeded
    pub fn mesh(&self) -> Option<MeshHandle> {
        self.shared.state.lock().mesh.clone()
    }

    /// Receive every status change (phase transitions and progress ticks)
    pub fn subscribe(&self) -> watch::Receiver<GenerationStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Send the sketch to the enhance service.
    ///
    /// Rejected without a remote call when the prompt is blank or the sketch
    /// is missing, and while another job is in flight. A prior finished or
    /// failed job is replaced.
    pub async fn submit_enhance(
        &self,
        sketch: Option<ImageHandle>,
        prompt: &str,
        negative_prompt: Option<&str>,
    ) -> Result<ImageHandle, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::Validation("prompt is empty".to_string()));
        }
        let Some(sketch) = sketch.filter(|s| !s.is_empty()) else {
            return Err(GenerationError::Validation("no sketch to enhance".to_string()));
        };
        let negative_prompt = negative_prompt
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let phase = self.begin_phase(
            "submit enhance",
            GenerationPhase::EnhanceInFlight,
            |phase| !phase.is_in_flight(),
            |state| {
                state.sketch = Some(sketch.clone());
                state.enhanced = None;
                state.mesh = None;
            },
        )?;
        info!("Enhance job {} started ({} byte sketch)", phase.epoch, sketch.len());

        let request = EnhanceRequest {
            sketch,
            prompt: prompt.to_string(),
            negative_prompt,
        };
        let result = tokio::select! {
            _ = phase.token.cancelled() => Err(GenerationError::Cancelled),
            result = self.backend.enhance(request) => result,
        };

        phase.finish(result, |state, image| {
            state.phase = GenerationPhase::EnhanceDone;
            state.enhanced = Some(image.clone());
        })
    }

    /// Send the enhanced image to the mesh service. Only valid from `EnhanceDone`.
    pub async fn submit_mesh(&self, image: ImageHandle) -> Result<MeshHandle, GenerationError> {
        if image.is_empty() {
            return Err(GenerationError::Validation("no image to convert".to_string()));
        }

        let phase = self.begin_phase(
            "submit mesh",
            GenerationPhase::MeshInFlight,
            |phase| phase == GenerationPhase::EnhanceDone,
            |state| state.mesh = None,
        )?;
        info!("Mesh job {} started ({} byte image)", phase.epoch, image.len());

        let result = tokio::select! {
            _ = phase.token.cancelled() => Err(GenerationError::Cancelled),
            result = self.backend.meshify(image) => result,
        };

        phase.finish(result, |state, mesh| {
            state.phase = GenerationPhase::MeshDone;
            state.mesh = Some(mesh.clone());
        })
    }

    /// Run both jobs back to back
    pub async fn generate(
        &self,
        sketch: Option<ImageHandle>,
        prompt: &str,
        negative_prompt: Option<&str>,
    ) -> Result<MeshHandle, GenerationError> {
        let enhanced = self.submit_enhance(sketch, prompt, negative_prompt).await?;
        self.submit_mesh(enhanced).await
    }

    /// Return to `Idle`, dropping handles, progress and any in-flight job.
    ///
    /// A response that arrives for the dropped job is ignored.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        if let Some(token) = state.in_flight.take() {
            token.cancel();
        }
        let epoch = state.epoch + 1;
        *state = JobState {
            epoch,
            ..JobState::default()
        };
        self.shared.publish(&state);
        info!("Generation pipeline reset (epoch {})", epoch);
    }

    fn begin_phase(
        &self,
        operation: &'static str,
        next: GenerationPhase,
        allowed: impl Fn(GenerationPhase) -> bool,
        prepare: impl FnOnce(&mut JobState),
    ) -> Result<InFlightPhase, GenerationError> {
        let token = CancellationToken::new();
        let epoch = {
            let mut state = self.shared.state.lock();
            if !allowed(state.phase) {
                debug!("{} rejected in phase {:?}", operation, state.phase);
                return Err(GenerationError::State {
                    operation,
                    phase: state.phase,
                });
            }
            prepare(&mut state);
            state.epoch += 1;
            state.phase = next;
            state.progress = 0;
            state.error = None;
            state.in_flight = Some(token.clone());
            self.shared.publish(&state);
            state.epoch
        };

        let (job, tick_ms) = match next {
            GenerationPhase::MeshInFlight => ("mesh", self.progress.mesh_tick_ms),
            _ => ("enhance", self.progress.enhance_tick_ms),
        };
        self.spawn_ticker(epoch, Duration::from_millis(tick_ms.max(1)), token.clone());
        Ok(InFlightPhase {
            shared: Arc::clone(&self.shared),
            epoch,
            token,
            job,
            armed: true,
        })
    }

    /// Advance synthetic progress until `token` is cancelled
    fn spawn_ticker(&self, epoch: u64, period: Duration, token: CancellationToken) {
        let shared = Arc::clone(&self.shared);
        let max_step = self.progress.max_step.max(1);
        let cap = self.progress.cap;
        let mut rng = match self.progress.seed {
            Some(seed) => fastrand::Rng::with_seed(seed.wrapping_add(epoch)),
            None => fastrand::Rng::new(),
        };

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !shared.tick(epoch, rng.u32(0..max_step), cap) {
                            break;
                        }
                    }
                }
            }
            debug!("Progress ticker for job {} stopped", epoch);
        });
    }
}

/// One running phase, owned by the submit future that started it.
///
/// Dropping it before `finish` (the caller gave up on the future) stops the
/// ticker and fails the phase with `Cancelled`, so the pipeline never stays
/// in flight with nobody waiting for the response.
struct InFlightPhase {
    shared: Arc<Shared>,
    epoch: u64,
    token: CancellationToken,
    job: &'static str,
    armed: bool,
}

impl InFlightPhase {
    fn finish<T>(
        mut self,
        result: Result<T, GenerationError>,
        on_success: impl FnOnce(&mut JobState, &T),
    ) -> Result<T, GenerationError> {
        self.armed = false;
        self.token.cancel();

        let mut state = self.shared.state.lock();
        if state.epoch != self.epoch {
            warn!(
                "Discarding {} result of superseded job {} (now {})",
                self.job, self.epoch, state.epoch
            );
            return Err(GenerationError::Cancelled);
        }
        state.in_flight = None;

        match result {
            Ok(value) => {
                on_success(&mut state, &value);
                state.progress = 100;
                state.error = None;
                info!("{} job {} finished", self.job, self.epoch);
                self.shared.publish(&state);
                Ok(value)
            }
            Err(e) => {
                warn!("{} job {} failed: {}", self.job, self.epoch, e);
                state.phase = GenerationPhase::Errored;
                state.progress = 0;
                state.error = Some(e.to_string());
                self.shared.publish(&state);
                Err(e)
            }
        }
    }
}

impl Drop for InFlightPhase {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.token.cancel();

        let mut state = self.shared.state.lock();
        if state.epoch != self.epoch || !state.phase.is_in_flight() {
            return;
        }
        warn!("{} job {} abandoned before its response arrived", self.job, self.epoch);
        state.in_flight = None;
        state.phase = GenerationPhase::Errored;
        state.progress = 0;
        state.error = Some(GenerationError::Cancelled.to_string());
        self.shared.publish(&state);
    }
}
