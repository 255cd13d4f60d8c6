use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lacefit_capture::{RecordedDetector, ReplayCamera};
use lacefit_core::{tilt_degrees, FaceObservation, Guideline, GuidelineState, Point};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod overlay;
mod replay;

use config::Config;
use replay::ReplayOptions;

#[derive(Parser)]
#[command(name = "lacefit", about = "Wig placement guidelines from facial landmarks")]
struct Cli {
    /// TOML config file (defaults to $LACEFIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive guidelines for one face observation (JSON) and print them
    Derive {
        observation: PathBuf,
    },
    /// Replay a recorded landmark stream (JSON Lines) through the tracker
    Replay {
        recording: PathBuf,
        /// Pace frames by their timestamps and drop late frames
        #[arg(long)]
        realtime: bool,
        /// Snapshot and freeze the overlay at this offset (ms)
        #[arg(long)]
        freeze_at: Option<u64>,
        /// Resume live guidance at this offset (ms)
        #[arg(long)]
        resume_at: Option<u64>,
        /// Write the snapshot overlay to this PNG
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
    },
    /// Render the overlay for one face observation to an image
    Render {
        observation: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Draw over this image instead of a black canvas
        #[arg(long)]
        background: Option<PathBuf>,
    },
    /// Print the tilt of a segment in degrees
    #[command(allow_negative_numbers = true)]
    Tilt {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Derive { observation } => {
            let obs = read_observation(&observation)?;
            let state = config.calculator().guidelines(&obs);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Commands::Replay {
            recording,
            realtime,
            freeze_at,
            resume_at,
            snapshot,
            width,
            height,
        } => {
            let opts = ReplayOptions {
                realtime,
                freeze_at: freeze_at.map(Duration::from_millis),
                resume_at: resume_at.map(Duration::from_millis),
            };
            let size = (
                width.unwrap_or(config.frame_width),
                height.unwrap_or(config.frame_height),
            );
            run_replay(&config, &recording, &opts, snapshot.as_deref(), size).await?;
        }
        Commands::Render {
            observation,
            out,
            width,
            height,
            background,
        } => {
            let obs = read_observation(&observation)?;
            let state = config.calculator().guidelines(&obs);
            let size = (
                width.unwrap_or(config.frame_width),
                height.unwrap_or(config.frame_height),
            );
            write_overlay(&state, &out, size, background.as_deref())?;
            println!("{}", state.advice);
            println!(
                "Tilt: {:.1}°  Forehead offset: {:.1} mm",
                state.tilt_degrees, state.forehead_offset_mm
            );
        }
        Commands::Tilt { x1, y1, x2, y2 } => {
            let segment = Guideline::new(Point::new(x1, y1), Point::new(x2, y2));
            println!("{:.3}", tilt_degrees(&segment));
        }
    }

    Ok(())
}

fn read_observation(path: &Path) -> Result<FaceObservation> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read observation {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid observation JSON in {}", path.display()))
}

async fn run_replay(
    config: &Config,
    recording: &Path,
    opts: &ReplayOptions,
    snapshot_path: Option<&Path>,
    size: (u32, u32),
) -> Result<()> {
    let mut camera = ReplayCamera::open(&recording.to_string_lossy())?;
    tracing::info!(path = %camera.path, realtime = opts.realtime, "replay starting");

    let (engine, mut outcomes) = engine::spawn_engine(RecordedDetector, config.calculator())?;
    let report =
        replay::run_replay(&mut camera, &engine, &mut outcomes, config.frame_gate(), opts).await;

    for (at, status) in &report.status_log {
        println!("{:>6} ms  {status}", at.as_millis());
    }
    println!(
        "frames: {}  processed: {}  gated: {}  dropped: {}  bad frames: {}",
        report.frames, report.processed, report.gated, report.dropped, report.source_errors
    );
    if let Some(state) = &report.final_state {
        println!(
            "last guidelines: tilt {:.1}°, forehead offset {:.1} mm",
            state.tilt_degrees, state.forehead_offset_mm
        );
    }

    if let Some(path) = snapshot_path {
        match &report.snapshot {
            Some(state) => {
                write_overlay(state, path, size, None)?;
                println!("snapshot written to {}", path.display());
            }
            None => tracing::warn!("no guidelines on screen at freeze time; snapshot skipped"),
        }
    }

    Ok(())
}

fn write_overlay(
    state: &GuidelineState,
    out: &Path,
    (width, height): (u32, u32),
    background: Option<&Path>,
) -> Result<()> {
    let mut canvas = match background {
        Some(path) => image::open(path)
            .with_context(|| format!("failed to open background {}", path.display()))?
            .to_rgba8(),
        None => overlay::blank_canvas(width, height),
    };
    overlay::render(state, &mut canvas);
    canvas
        .save(out)
        .with_context(|| format!("failed to write overlay {}", out.display()))?;
    tracing::info!(path = %out.display(), width = canvas.width(), height = canvas.height(), "overlay written");
    Ok(())
}
