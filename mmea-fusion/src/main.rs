//! mmea-fusion - multi-modal emotion estimation front end
//!
//! Subcommands:
//! - `fuse <session.json>`: fuse one `{ "facial", "voice", "text" }` reading
//!   set and print the `FusionResult` as JSON
//! - `stream <frames.json>`: replay per-frame face ensemble outputs through
//!   one stream and print one estimate per frame plus the final reading
//! - `init-config`: write the default configuration file
//!
//! Logs go to stderr; results go to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mmea_common::config::{write_toml_config, ConfigResolver};
use mmea_fusion::config::{PipelineConfig, MODULE_NAME};
use mmea_fusion::labels::LabelSet;
use mmea_fusion::{EmotionVector, FusionResult, Pipeline, SessionReadings};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mmea-fusion", version, about = "Multi-modal emotion fusion pipeline")]
struct Cli {
    /// Config file (overrides MMEA_CONFIG and the default location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fuse one set of per-modality readings
    Fuse {
        /// JSON file with "facial", "voice" and "text" readings
        session: PathBuf,
        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },
    /// Replay face ensemble outputs through one stream
    Stream {
        /// JSON array of frames; each frame is an array of label->score maps,
        /// one per configured face variant
        frames: PathBuf,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = ConfigResolver::new(MODULE_NAME).resolve(cli.config.as_deref());
    let config = match PipelineConfig::load(&config_path) {
        Ok(config) => config,
        // A broken file must not block regenerating it
        Err(_) if matches!(cli.command, Command::InitConfig { force: true }) => {
            PipelineConfig::default()
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to load config {}", config_path.display())))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting mmea-fusion v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_path.exists() {
        info!("Config: {}", config_path.display());
    } else {
        info!("Config: {} (not found, using defaults)", config_path.display());
    }

    match cli.command {
        Command::Fuse { session, pretty } => run_fuse(config, &session, pretty).await,
        Command::Stream { frames } => run_stream(config, &frames).await,
        Command::InitConfig { force } => run_init_config(&config_path, force),
    }
}

async fn run_fuse(config: PipelineConfig, session: &Path, pretty: bool) -> Result<()> {
    let pipeline = Pipeline::new(config)?;

    let result = match read_session(session).await {
        Ok(readings) => pipeline.fuse(&readings),
        Err(e) => {
            error!("Failed to read {}: {:#}", session.display(), e);
            FusionResult::failed(format!("{:#}", e))
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    if let Some(e) = result.error {
        anyhow::bail!(e);
    }
    Ok(())
}

async fn read_session(path: &Path) -> Result<SessionReadings> {
    let text = tokio::fs::read_to_string(path).await?;
    let readings = serde_json::from_str(&text)?;
    Ok(readings)
}

async fn run_stream(config: PipelineConfig, frames_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let mut stream = pipeline.face_stream()?;

    let text = tokio::fs::read_to_string(frames_path)
        .await
        .with_context(|| format!("Failed to read {}", frames_path.display()))?;
    let frames: Vec<Vec<EmotionVector>> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", frames_path.display()))?;

    info!(
        "Replaying {} frames through stream {}",
        frames.len(),
        stream.session_id()
    );

    let face = LabelSet::face();
    let mut failed = 0usize;
    for (i, outputs) in frames.iter().enumerate() {
        let aligned: mmea_fusion::Result<Vec<EmotionVector>> =
            outputs.iter().map(|v| v.aligned_to(&face)).collect();

        match aligned.and_then(|outputs| stream.process_frame(&outputs)) {
            Ok(estimate) => println!("{}", serde_json::to_string(&estimate)?),
            Err(e) => {
                warn!("Frame {} skipped: {}", i, e);
                failed += 1;
            }
        }
    }

    match stream.reading() {
        Some(reading) => println!("{}", serde_json::to_string(&reading)?),
        None => warn!("No frame was processed"),
    }

    info!(
        "Stream {} done: {} frames, {} skipped, calibration generation {}",
        stream.session_id(),
        stream.frames_processed(),
        failed,
        stream.calibration().snapshot().generation()
    );
    Ok(())
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_toml_config(&PipelineConfig::default(), path)?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
