//! Message dispatch between the UI protocol and the drawing/generation core
//!
//! A [`Session`] owns one canvas, one generation job and the viewer state.
//! Every inbound [`UiToApp`] message is applied in order; notifications for
//! the UI collect in an outbox drained by the caller.
//!
//! `Improve` spawns the enhance and mesh jobs onto the runtime and returns
//! at once, so painting, undo, download and reset keep working while the
//! remote calls run. Job notifications reach the outbox on the next
//! dispatch or drain.

use std::path::{Path, PathBuf};

use anyhow::Context;
use painting::{Sketchpad, parse_hex_color};
use sketchmesh_config::AppConfig;
use sketchmesh_generation::{
    GenerationBackend, GenerationError, GenerationPipeline, GenerationStatus, ImageHandle,
};
use sketchmesh_ipc::{AppToUi, GenerationCommand, PaintCommand, UiToApp, ViewerState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Full-canvas download
pub const DOWNLOAD_FILE: &str = "drawing.png";
/// Autocropped sketch sent to the enhance service
pub const SKETCH_FILE: &str = "sketch.png";
/// Image returned by the enhance service
pub const ENHANCED_FILE: &str = "enhanced.png";
/// Mesh returned by the mesh service, loaded by the viewer
pub const MESH_FILE: &str = "response.glb";

/// Write one output file into `dir`, returning its path
pub fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Sent from a running generation job back to its session
#[derive(Debug)]
enum JobEvent {
    Notify(AppToUi),
    /// The mesh file is on disk and can be handed to the viewer
    MeshReady(PathBuf),
}

pub struct Session<B> {
    sketchpad: Sketchpad,
    pipeline: GenerationPipeline<B>,
    viewer: ViewerState,
    out_dir: PathBuf,
    outbox: Vec<AppToUi>,
    /// Background enhance + mesh run started by the last `Improve`
    job: Option<JoinHandle<()>>,
    job_tx: mpsc::UnboundedSender<JobEvent>,
    job_rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl<B: GenerationBackend> Session<B> {
    pub fn new(config: &AppConfig, backend: B, out_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let canvas = &config.canvas;
        let background = parse_hex_color(&canvas.background).context("canvas.background")?;
        let mut sketchpad = Sketchpad::new(
            canvas.width,
            canvas.height,
            background,
            canvas.history_capacity,
        )?
        .with_export_padding(canvas.export_padding);
        sketchpad
            .set_color_hex(&canvas.stroke_color)
            .context("canvas.stroke_color")?;
        sketchpad.set_line_width(canvas.line_width);

        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;

        let (job_tx, job_rx) = mpsc::unbounded_channel();
        Ok(Self {
            sketchpad,
            pipeline: GenerationPipeline::new(backend, config.progress.clone()),
            viewer: ViewerState::default(),
            out_dir,
            outbox: Vec::new(),
            job: None,
            job_tx,
            job_rx,
        })
    }

    pub fn sketchpad(&self) -> &Sketchpad {
        &self.sketchpad
    }

    pub fn pipeline(&self) -> &GenerationPipeline<B> {
        &self.pipeline
    }

    pub fn viewer(&self) -> &ViewerState {
        &self.viewer
    }

    /// Live generation status, including progress ticks
    pub fn subscribe_status(&self) -> watch::Receiver<GenerationStatus> {
        self.pipeline.subscribe()
    }

    /// True while an `Improve` run has not finished
    pub fn is_generating(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.is_finished())
    }

    /// Take the notifications queued since the last drain
    pub fn drain_outbound(&mut self) -> Vec<AppToUi> {
        self.collect_job_events();
        std::mem::take(&mut self.outbox)
    }

    /// Wait until the current generation run (if any) has finished and its
    /// notifications are in the outbox
    pub async fn wait_for_generation(&mut self) -> anyhow::Result<()> {
        if let Some(job) = self.job.take() {
            match job.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => debug!("Generation run aborted"),
                Err(e) => return Err(anyhow::anyhow!("generation run failed: {}", e)),
            }
        }
        self.collect_job_events();
        Ok(())
    }

    /// Apply one UI message.
    ///
    /// Must be called from within a tokio runtime. User-facing failures (bad
    /// color, rejected or failed generation) become `AppToUi::Error`
    /// notifications; only local I/O failures are returned.
    pub fn dispatch(&mut self, message: UiToApp) -> anyhow::Result<()> {
        self.collect_job_events();
        match message {
            UiToApp::Paint(cmd) => self.handle_paint(cmd),
            UiToApp::Generation(cmd) => self.handle_generation(cmd),
        }
    }

    fn handle_paint(&mut self, cmd: PaintCommand) -> anyhow::Result<()> {
        match cmd {
            PaintCommand::SetStrokeColor { color } => {
                if let Err(e) = self.sketchpad.set_color_hex(&color) {
                    warn!("Ignoring stroke color {:?}: {}", color, e);
                    self.notify_error("color", e.to_string());
                }
            }
            PaintCommand::SetLineWidth { width } => {
                self.sketchpad.set_line_width(width);
                debug!("Line width {}", self.sketchpad.style().width);
            }
            PaintCommand::SetTool { tool } => {
                self.sketchpad.set_tool(tool);
                debug!("Tool {:?}", tool);
            }
            PaintCommand::PointerDown { x, y } => {
                self.sketchpad.begin_stroke(x, y);
                self.notify_history();
            }
            PaintCommand::PointerMove { x, y, pressed } => {
                if pressed && self.sketchpad.is_stroking() {
                    self.sketchpad.stroke_to(x, y);
                } else {
                    self.sketchpad.move_to(x, y);
                }
            }
            PaintCommand::PointerUp => self.sketchpad.end_stroke(),
            PaintCommand::Clear => {
                self.sketchpad.clear();
                self.notify_history();
            }
            PaintCommand::Undo => {
                if self.sketchpad.undo() {
                    info!("Undo ({} left)", self.sketchpad.undo_count());
                } else {
                    debug!("Undo: nothing to undo");
                }
                self.notify_history();
            }
            PaintCommand::Download => {
                let image = self.sketchpad.download()?;
                let path = write_artifact(&self.out_dir, DOWNLOAD_FILE, &image.bytes)?;
                self.notify_saved("download", &path);
            }
        }
        Ok(())
    }

    fn handle_generation(&mut self, cmd: GenerationCommand) -> anyhow::Result<()> {
        match cmd {
            GenerationCommand::Improve {
                prompt,
                negative_prompt,
            } => self.improve(prompt, negative_prompt)?,
            GenerationCommand::Reset => self.reset_generation(),
            GenerationCommand::ToggleModel => {
                let shown = self.viewer.toggle();
                debug!("Model viewer {}", if shown { "shown" } else { "hidden" });
                self.outbox.push(AppToUi::ViewerChanged(self.viewer.clone()));
            }
        }
        Ok(())
    }

    /// Export the cropped sketch, then start the enhance and mesh jobs in the background
    fn improve(&mut self, prompt: String, negative_prompt: Option<String>) -> anyhow::Result<()> {
        if prompt.trim().is_empty() {
            self.notify_error("validation", "Enter a prompt before improving the sketch".to_string());
            return Ok(());
        }
        if self.is_generating() || self.pipeline.phase().is_in_flight() {
            let error = GenerationError::State {
                operation: "improve",
                phase: self.pipeline.phase(),
            };
            debug!("Improve rejected: {}", error);
            self.notify_error(error.code(), error.to_string());
            return Ok(());
        }

        let (region, sketch) = self.sketchpad.export_sketch()?;
        debug!("Sketch region {:?}", region);
        let path = write_artifact(&self.out_dir, SKETCH_FILE, &sketch.bytes)?;
        self.notify_saved("sketch", &path);

        self.viewer.clear();
        let run = GenerationRun {
            pipeline: self.pipeline.clone(),
            out_dir: self.out_dir.clone(),
            events: self.job_tx.clone(),
        };
        let sketch = ImageHandle::from(sketch.bytes);
        self.job = Some(tokio::spawn(run.run(sketch, prompt, negative_prompt)));
        Ok(())
    }

    /// Drop the running job and its undelivered notifications, then reset the pipeline
    fn reset_generation(&mut self) {
        if let Some(job) = self.job.take() {
            job.abort();
        }
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        self.job_tx = job_tx;
        self.job_rx = job_rx;

        self.pipeline.reset();
        self.viewer.clear();
        self.notify_status();
        self.outbox.push(AppToUi::ViewerChanged(self.viewer.clone()));
    }

    fn collect_job_events(&mut self) {
        while let Ok(event) = self.job_rx.try_recv() {
            match event {
                JobEvent::Notify(message) => self.outbox.push(message),
                JobEvent::MeshReady(path) => {
                    self.viewer.mesh_path = Some(path);
                    self.outbox.push(AppToUi::ViewerChanged(self.viewer.clone()));
                }
            }
        }
    }

    fn notify_status(&mut self) {
        self.outbox.push(AppToUi::GenerationStatus(self.pipeline.status()));
    }

    fn notify_history(&mut self) {
        self.outbox.push(AppToUi::HistoryChanged {
            depth: self.sketchpad.undo_count(),
        });
    }

    fn notify_saved(&mut self, kind: &str, path: &Path) {
        self.outbox.push(saved(kind, path));
    }

    fn notify_error(&mut self, code: &str, message: String) {
        self.outbox.push(AppToUi::Error {
            code: code.to_string(),
            message,
        });
    }
}

fn saved(kind: &str, path: &Path) -> AppToUi {
    AppToUi::ArtifactSaved {
        kind: kind.to_string(),
        path: path.display().to_string(),
    }
}

/// One enhance + mesh run, owned by a spawned task
struct GenerationRun<B> {
    pipeline: GenerationPipeline<B>,
    out_dir: PathBuf,
    events: mpsc::UnboundedSender<JobEvent>,
}

impl<B: GenerationBackend> GenerationRun<B> {
    async fn run(self, sketch: ImageHandle, prompt: String, negative_prompt: Option<String>) {
        if let Err(e) = self.stages(sketch, &prompt, negative_prompt.as_deref()).await {
            error!("Generation output failed: {:#}", e);
            self.send(JobEvent::Notify(AppToUi::Error {
                code: "io".to_string(),
                message: format!("{:#}", e),
            }));
        }
    }

    async fn stages(
        &self,
        sketch: ImageHandle,
        prompt: &str,
        negative_prompt: Option<&str>,
    ) -> anyhow::Result<()> {
        let enhanced = match self
            .pipeline
            .submit_enhance(Some(sketch), prompt, negative_prompt)
            .await
        {
            Ok(image) => image,
            Err(e) => {
                self.failed(e);
                return Ok(());
            }
        };
        let path = write_artifact(&self.out_dir, ENHANCED_FILE, enhanced.bytes())?;
        self.send(JobEvent::Notify(saved("enhanced", &path)));
        self.send_status();

        let mesh = match self.pipeline.submit_mesh(enhanced).await {
            Ok(mesh) => mesh,
            Err(e) => {
                self.failed(e);
                return Ok(());
            }
        };
        let path = write_artifact(&self.out_dir, MESH_FILE, mesh.bytes())?;
        self.send(JobEvent::Notify(saved("mesh", &path)));
        self.send_status();
        self.send(JobEvent::MeshReady(path));
        Ok(())
    }

    fn failed(&self, error: GenerationError) {
        if error == GenerationError::Cancelled {
            debug!("Generation run cancelled");
            return;
        }
        warn!("Generation failed: {}", error);
        self.send(JobEvent::Notify(AppToUi::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }));
        self.send_status();
    }

    fn send_status(&self) {
        self.send(JobEvent::Notify(AppToUi::GenerationStatus(self.pipeline.status())));
    }

    /// The session drops its receiver on reset; late events are discarded
    fn send(&self, event: JobEvent) {
        if self.events.send(event).is_err() {
            debug!("Generation event dropped after reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchmesh_generation::{EnhanceRequest, GenerationPhase, MeshHandle};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockBackend {
        fail_mesh: bool,
        /// When set, enhance calls wait for a permit
        gate: Option<Arc<Notify>>,
        sketches: Mutex<Vec<EnhanceRequest>>,
    }

    impl GenerationBackend for MockBackend {
        async fn enhance(&self, request: EnhanceRequest) -> Result<ImageHandle, GenerationError> {
            self.sketches.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ImageHandle::new(b"enhanced".to_vec()))
        }

        async fn meshify(&self, _image: ImageHandle) -> Result<MeshHandle, GenerationError> {
            if self.fail_mesh {
                return Err(GenerationError::Remote {
                    status: 500,
                    message: "mesh service down".into(),
                });
            }
            Ok(MeshHandle::new(b"glb".to_vec()))
        }
    }

    fn out_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sketchmesh-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.canvas.width = 64;
        config.canvas.height = 48;
        config.progress.seed = Some(7);
        config
    }

    fn paint(cmd: PaintCommand) -> UiToApp {
        UiToApp::Paint(cmd)
    }

    fn improve(prompt: &str) -> UiToApp {
        UiToApp::Generation(GenerationCommand::Improve {
            prompt: prompt.to_string(),
            negative_prompt: None,
        })
    }

    fn draw_line(session: &mut Session<MockBackend>, from: (f32, f32), to: (f32, f32)) {
        session
            .dispatch(paint(PaintCommand::PointerDown { x: from.0, y: from.1 }))
            .unwrap();
        session
            .dispatch(paint(PaintCommand::PointerMove {
                x: to.0,
                y: to.1,
                pressed: true,
            }))
            .unwrap();
        session.dispatch(paint(PaintCommand::PointerUp)).unwrap();
    }

    #[tokio::test]
    async fn test_stroke_and_undo() {
        let dir = out_dir("undo");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();

        draw_line(&mut session, (10.0, 10.0), (40.0, 30.0));
        assert_eq!(session.sketchpad().undo_count(), 1);
        assert_eq!(session.sketchpad().surface().get_pixel(25, 20), Some(painting::BLACK));

        session.dispatch(paint(PaintCommand::Undo)).unwrap();
        assert_eq!(session.sketchpad().surface().get_pixel(25, 20), Some(painting::WHITE));

        let outbound = session.drain_outbound();
        assert_eq!(
            outbound,
            vec![
                AppToUi::HistoryChanged { depth: 1 },
                AppToUi::HistoryChanged { depth: 0 }
            ]
        );
        assert!(session.drain_outbound().is_empty());
    }

    #[tokio::test]
    async fn test_hover_does_not_draw() {
        let dir = out_dir("hover");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();

        session
            .dispatch(paint(PaintCommand::PointerMove {
                x: 20.0,
                y: 20.0,
                pressed: false,
            }))
            .unwrap();
        session
            .dispatch(paint(PaintCommand::PointerMove {
                x: 30.0,
                y: 20.0,
                pressed: true,
            }))
            .unwrap();

        assert_eq!(session.sketchpad().surface().get_pixel(25, 20), Some(painting::WHITE));
        assert_eq!(session.sketchpad().undo_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_color_reports_error() {
        let dir = out_dir("color");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();

        session
            .dispatch(paint(PaintCommand::SetStrokeColor {
                color: "red".to_string(),
            }))
            .unwrap();

        let outbound = session.drain_outbound();
        assert!(matches!(&outbound[..], [AppToUi::Error { code, .. }] if code == "color"));
        assert_eq!(session.sketchpad().style().color, painting::BLACK);
    }

    #[tokio::test]
    async fn test_download_writes_full_canvas() {
        let dir = out_dir("download");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();

        session.dispatch(paint(PaintCommand::Download)).unwrap();

        let path = dir.join(DOWNLOAD_FILE);
        assert!(std::fs::read(&path).unwrap().starts_with(b"\x89PNG"));
        assert_eq!(
            session.drain_outbound(),
            vec![AppToUi::ArtifactSaved {
                kind: "download".to_string(),
                path: path.display().to_string()
            }]
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_improve_produces_mesh() {
        let dir = out_dir("improve");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();
        draw_line(&mut session, (10.0, 10.0), (40.0, 30.0));
        session.drain_outbound();

        session
            .dispatch(UiToApp::Generation(GenerationCommand::Improve {
                prompt: " mountain lake ".to_string(),
                negative_prompt: Some(String::new()),
            }))
            .unwrap();
        session.wait_for_generation().await.unwrap();
        assert!(!session.is_generating());

        assert_eq!(session.pipeline().phase(), GenerationPhase::MeshDone);
        assert_eq!(std::fs::read(dir.join(MESH_FILE)).unwrap(), b"glb");
        assert_eq!(std::fs::read(dir.join(ENHANCED_FILE)).unwrap(), b"enhanced");
        assert!(std::fs::read(dir.join(SKETCH_FILE)).unwrap().starts_with(b"\x89PNG"));
        assert_eq!(session.viewer().mesh_path, Some(dir.join(MESH_FILE)));
        assert!(!session.viewer().show_model);

        let outbound = session.drain_outbound();
        assert!(matches!(
            outbound.last(),
            Some(AppToUi::ViewerChanged(viewer)) if viewer.mesh_path == Some(dir.join(MESH_FILE))
        ));

        let requests = session.pipeline().backend().sketches.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "mountain lake");
        assert_eq!(requests[0].negative_prompt, None);
        drop(requests);

        session
            .dispatch(UiToApp::Generation(GenerationCommand::ToggleModel))
            .unwrap();
        assert!(session.viewer().show_model);

        session
            .dispatch(UiToApp::Generation(GenerationCommand::Reset))
            .unwrap();
        assert_eq!(session.pipeline().phase(), GenerationPhase::Idle);
        assert_eq!(session.viewer(), &ViewerState::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_blank_prompt_skips_generation() {
        let dir = out_dir("blank");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();

        session.dispatch(improve("   ")).unwrap();
        session.wait_for_generation().await.unwrap();

        assert!(session.pipeline().backend().sketches.lock().unwrap().is_empty());
        assert!(!dir.join(SKETCH_FILE).exists());
        let outbound = session.drain_outbound();
        assert!(matches!(&outbound[..], [AppToUi::Error { code, .. }] if code == "validation"));
    }

    #[tokio::test]
    async fn test_mesh_failure_reported() {
        let dir = out_dir("mesh-failure");
        let backend = MockBackend {
            fail_mesh: true,
            ..MockBackend::default()
        };
        let mut session = Session::new(&small_config(), backend, &dir).unwrap();
        draw_line(&mut session, (10.0, 10.0), (40.0, 30.0));
        session.drain_outbound();

        session.dispatch(improve("castle")).unwrap();
        session.wait_for_generation().await.unwrap();

        assert_eq!(session.pipeline().phase(), GenerationPhase::Errored);
        assert!(!dir.join(MESH_FILE).exists());
        assert!(session.viewer().mesh_path.is_none());

        let outbound = session.drain_outbound();
        assert!(outbound.iter().any(
            |m| matches!(m, AppToUi::Error { code, message } if code == "remote" && message.contains("mesh service down"))
        ));
        assert!(matches!(
            outbound.last(),
            Some(AppToUi::GenerationStatus(status)) if status.phase == GenerationPhase::Errored
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canvas_stays_live_while_generating() {
        let dir = out_dir("live");
        let gate = Arc::new(Notify::new());
        let backend = MockBackend {
            gate: Some(gate.clone()),
            ..MockBackend::default()
        };
        let mut session = Session::new(&small_config(), backend, &dir).unwrap();
        let mut status = session.subscribe_status();
        draw_line(&mut session, (5.0, 5.0), (20.0, 5.0));

        session.dispatch(improve("castle")).unwrap();
        status
            .wait_for(|s| s.phase == GenerationPhase::EnhanceInFlight)
            .await
            .unwrap();
        assert!(session.is_generating());

        // Drawing and undo bookkeeping continue while the enhance call is pending
        draw_line(&mut session, (10.0, 30.0), (50.0, 30.0));
        assert_eq!(session.sketchpad().surface().get_pixel(30, 30), Some(painting::BLACK));
        assert_eq!(session.sketchpad().undo_count(), 2);

        session.dispatch(improve("castle")).unwrap();
        let outbound = session.drain_outbound();
        assert!(outbound
            .iter()
            .any(|m| matches!(m, AppToUi::Error { code, .. } if code == "state")));
        assert_eq!(session.pipeline().backend().sketches.lock().unwrap().len(), 1);

        session
            .dispatch(UiToApp::Generation(GenerationCommand::Reset))
            .unwrap();
        assert_eq!(session.pipeline().phase(), GenerationPhase::Idle);
        assert!(!session.is_generating());

        gate.notify_one();
        session.wait_for_generation().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(session.pipeline().phase(), GenerationPhase::Idle);
        assert!(!dir.join(ENHANCED_FILE).exists());
        assert!(!dir.join(MESH_FILE).exists());
        assert_eq!(session.viewer(), &ViewerState::default());
        let outbound = session.drain_outbound();
        assert!(!outbound.iter().any(|m| matches!(m, AppToUi::ArtifactSaved { kind, .. } if kind != "sketch")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_improve_again_after_finish() {
        let dir = out_dir("again");
        let mut session = Session::new(&small_config(), MockBackend::default(), &dir).unwrap();
        draw_line(&mut session, (10.0, 10.0), (40.0, 30.0));

        session.dispatch(improve("castle")).unwrap();
        session.wait_for_generation().await.unwrap();
        session.dispatch(improve("tower")).unwrap();
        session.wait_for_generation().await.unwrap();

        assert_eq!(session.pipeline().phase(), GenerationPhase::MeshDone);
        assert_eq!(session.pipeline().backend().sketches.lock().unwrap().len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
