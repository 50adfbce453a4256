// SPDX-License-Identifier: MIT OR Apache-2.0
//! beatplay - headless beatmap player
//!
//! Loads the demo beatmap into a [`PlaybackEngine`], evaluates frames over a
//! time range and reports per-frame counters. Frames can be dumped as JSON
//! for inspection or golden comparisons.

mod cli;
mod config;
mod demo;

use beatplay_graph::{DocumentError, EngineError, Frame, HeadlessRegistry, PlaybackEngine};
use clap::Parser;
use cli::Args;
use config::{AppConfig, ConfigError};
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Driver failures
#[derive(Debug, Error)]
enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_directives()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting beatplay v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        tracing::error!("beatplay failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let mut config = AppConfig::load_or_default(&args.config)?;
    args.apply_overrides(&mut config);
    config.validate()?;
    if args.write_config {
        config.save(&args.config)?;
    }

    let mut doc = demo::build(config.demo_instances)?;
    let mut engine = PlaybackEngine::new(&config.engine)?;
    engine.load(&mut doc)?;
    let registry = HeadlessRegistry::default();

    let mut frames: Vec<Frame> = Vec::new();
    let mut frame_count = 0usize;
    let mut drawn_total = 0usize;
    let mut peak_alive = 0usize;
    let mut skipped_total = 0usize;
    let mut edit_step = 0usize;
    let started = Instant::now();

    for time in config.frame_times() {
        if args.live_edits && time >= (edit_step + 1) as f32 {
            edit_step += 1;
            demo::live_edit(&mut doc, edit_step)?;
            let applied = engine.sync(&mut doc)?;
            tracing::debug!("Live edit {} at {:.3}s: {} changes", edit_step, time, applied);
        }

        let frame = engine.compute_frame(&doc, time, &registry);
        tracing::trace!(
            "t={:.3} alive={} drawn={} skipped={}",
            time,
            frame.stats.alive,
            frame.stats.drawn,
            frame.stats.skipped
        );

        frame_count += 1;
        drawn_total += frame.stats.drawn;
        skipped_total += frame.stats.skipped;
        peak_alive = peak_alive.max(frame.stats.alive);
        if config.dump_json.is_some() {
            frames.push(frame);
        }
    }

    let elapsed = started.elapsed();
    tracing::info!(
        "Evaluated {} frames in {:.2?} ({:.1} us/frame): peak alive {}, {} draws, {} skipped",
        frame_count,
        elapsed,
        elapsed.as_secs_f64() * 1e6 / frame_count.max(1) as f64,
        peak_alive,
        drawn_total,
        skipped_total
    );

    if let Some(path) = &config.dump_json {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &frames)?;
        tracing::info!("Wrote {} frames to {:?}", frames.len(), path);
    }

    Ok(())
}
