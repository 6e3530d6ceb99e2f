//! sketchmesh - sketch canvas with an enhance-then-mesh generation workflow
//!
//! Headless front end: replays recorded UI sessions against the drawing core
//! or sends an existing sketch straight through the generation services.

mod cli;
mod session;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::CliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
