//! Command-line interface (clap derive)
//!
//! Usage:
//!   sketchmesh replay session.json --out out/
//!   sketchmesh generate --sketch sketch.png --prompt "mountain lake" --out out/
//!
//! Notifications for the UI are printed to stdout as JSON lines; logs go to
//! stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sketchmesh_config::AppConfig;
use sketchmesh_generation::{
    GenerationBackend, GenerationPipeline, GenerationStatus, ImageHandle, RemoteServices,
};
use sketchmesh_ipc::{GenerationCommand, UiToApp, parse_script};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::{ENHANCED_FILE, MESH_FILE, Session, write_artifact};

#[derive(Parser, Debug)]
#[command(
    name = "sketchmesh",
    version,
    about = "Sketch canvas that turns drawings into images and 3D models"
)]
pub struct CliArgs {
    /// TOML config file. Environment overrides apply on top.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a recorded session (JSON array of UI messages) on a fresh canvas
    Replay {
        #[arg(value_name = "SCRIPT.json")]
        script: PathBuf,

        /// Directory for drawing.png, sketch.png, enhanced.png and response.glb
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },
    /// Send an existing sketch through the enhance and mesh services
    Generate {
        /// Sketch image (PNG)
        #[arg(short, long, value_name = "FILE")]
        sketch: PathBuf,

        #[arg(short, long)]
        prompt: String,

        #[arg(short, long)]
        negative_prompt: Option<String>,

        #[arg(short, long, default_value = ".", value_name = "DIR")]
        out: PathBuf,
    },
}

pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("loading config")?;
    let backend = RemoteServices::from_config(&config.services)?;
    info!(
        "Enhance service {}, mesh service {}",
        backend.enhance_url(),
        backend.mesh_url()
    );

    match args.command {
        Command::Replay { script, out } => replay(&config, backend, &script, &out).await,
        Command::Generate {
            sketch,
            prompt,
            negative_prompt,
            out,
        } => generate(&config, backend, &sketch, &prompt, negative_prompt.as_deref(), &out).await,
    }
}

async fn replay<B: GenerationBackend>(
    config: &AppConfig,
    backend: B,
    script: &Path,
    out: &Path,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("reading {}", script.display()))?;
    let messages = parse_script(&text).with_context(|| format!("parsing {}", script.display()))?;

    let mut session = Session::new(config, backend, out)?;
    let progress_log = spawn_progress_log(session.subscribe_status());
    info!("Replaying {} messages from {}", messages.len(), script.display());

    for message in messages {
        // A recorded session waits for the model before acting on it again
        if waits_for_generation(&message) {
            session.wait_for_generation().await?;
        }
        session.dispatch(message)?;
        print_outbound(&mut session)?;
    }
    session.wait_for_generation().await?;
    print_outbound(&mut session)?;
    progress_log.abort();

    info!(
        "Replay finished: {} undo steps, generation {}, model {}",
        session.sketchpad().undo_count(),
        session.pipeline().phase().label(),
        if session.viewer().show_model { "shown" } else { "hidden" }
    );
    Ok(())
}

fn waits_for_generation(message: &UiToApp) -> bool {
    matches!(
        message,
        UiToApp::Generation(GenerationCommand::Improve { .. } | GenerationCommand::ToggleModel)
    )
}

fn print_outbound<B: GenerationBackend>(session: &mut Session<B>) -> anyhow::Result<()> {
    for outbound in session.drain_outbound() {
        println!("{}", outbound.to_json()?);
    }
    Ok(())
}

async fn generate<B: GenerationBackend>(
    config: &AppConfig,
    backend: B,
    sketch: &Path,
    prompt: &str,
    negative_prompt: Option<&str>,
    out: &Path,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(sketch).with_context(|| format!("reading {}", sketch.display()))?;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let pipeline = GenerationPipeline::new(backend, config.progress.clone());
    let progress_log = spawn_progress_log(pipeline.subscribe());
    let result = pipeline
        .generate(Some(ImageHandle::from(bytes)), prompt, negative_prompt)
        .await;
    progress_log.abort();

    if let Some(image) = pipeline.enhanced_image() {
        write_artifact(out, ENHANCED_FILE, image.bytes())?;
    }
    let mesh = result?;
    write_artifact(out, MESH_FILE, mesh.bytes())?;
    Ok(())
}

/// Log phase changes at info and progress ticks at debug
fn spawn_progress_log(mut status: watch::Receiver<GenerationStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_phase = status.borrow().phase;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.phase != last_phase {
                info!("Generation {}", current.phase.label());
                last_phase = current.phase;
            } else {
                debug!("{}% {}", current.progress, current.message);
            }
        }
    })
}
