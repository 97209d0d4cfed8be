#![deny(clippy::all)]

mod analysis;
mod cli;
mod config;
mod error;
mod gateway;
mod gemini;
mod render;
mod session;
mod storage;
mod video;

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Re-export error types (used by other modules)
#[allow(unused_imports)]
pub use error::*;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Pick up GEMINI_API_KEY and overrides from a local .env, if present
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }

    // Initialize tracing for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    // Configuration problems are fatal at startup, never mid-run
    let config = config::load_config()?;
    let creds = config::Credentials::from_env()?;
    info!(
        analysis_model = %config.gemini.analysis_model,
        image_model = %config.gemini.image_model,
        "Configuration loaded"
    );

    let client = Arc::new(gemini::GeminiClient::new(&config, &creds)?);
    drop(creds);

    let controller = session::SessionController::new(client.clone(), client);
    session::spawn_event_handler(controller.subscribe(), args.verbose);

    let out_dir = args
        .out
        .clone()
        .or_else(|| storage::thumbnails_dir(config.output.directory.as_deref()))
        .context("Could not determine a directory for thumbnails; pass --out")?;
    let output = cli::Output {
        dir: out_dir,
        stem: args
            .video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string()),
        open: args.open,
    };

    let video = video::VideoFile::open(&args.video)
        .await
        .with_context(|| format!("Cannot open {}", args.video.display()))?;

    controller.select_aspect_ratio(args.aspect);
    let result = controller.upload_and_analyze(video).await;

    println!("{}", render::render_state(&controller.snapshot()));
    output.save_current(&controller);

    if !args.no_interactive && cli::has_results(&controller) {
        cli::run_interactive(&controller, &output).await;
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
