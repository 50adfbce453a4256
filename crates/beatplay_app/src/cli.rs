// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command-line arguments.

use crate::config::{AppConfig, CONFIG_FILE_NAME};
use clap::Parser;
use std::path::PathBuf;

/// Headless beatmap player
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (RON), created with --write-config
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// First evaluated time in seconds
    #[arg(long = "start", value_name = "SECONDS")]
    pub start_time: Option<f32>,

    /// Last evaluated time in seconds
    #[arg(long = "end", value_name = "SECONDS")]
    pub end_time: Option<f32>,

    /// Frames per second
    #[arg(long = "fps", value_name = "N")]
    pub frame_rate: Option<f32>,

    /// Randomization seed
    #[arg(short = 's', long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Worker threads (0: all cores)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub parallelism: Option<usize>,

    /// Prefab instances in the demo scene
    #[arg(long = "instances", value_name = "N")]
    pub demo_instances: Option<usize>,

    /// Write every frame as JSON to this file
    #[arg(short = 'd', long = "dump", value_name = "FILE")]
    pub dump_json: Option<PathBuf>,

    /// Apply a scripted document edit once per second of song time
    #[arg(long = "live-edits")]
    pub live_edits: bool,

    /// Save the effective settings to the config file
    #[arg(long = "write-config")]
    pub write_config: bool,

    /// Increase logging verbosity (default: info, -v: debug, -vv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Log filter for the requested verbosity
    pub fn log_directives(&self) -> &'static str {
        match self.verbosity {
            0 => "beatplay=info,beatplay_graph=info",
            1 => "beatplay=debug,beatplay_graph=debug",
            _ => "beatplay=trace,beatplay_graph=trace,beatplay_sequencer=trace",
        }
    }

    /// Override settings with the values given on the command line
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(start) = self.start_time {
            config.start_time = start;
        }
        if let Some(end) = self.end_time {
            config.end_time = end;
        }
        if let Some(rate) = self.frame_rate {
            config.frame_rate = rate;
        }
        if let Some(seed) = self.seed {
            config.engine.seed = seed;
        }
        if let Some(jobs) = self.parallelism {
            config.engine.parallelism = jobs;
        }
        if let Some(instances) = self.demo_instances {
            config.demo_instances = instances;
        }
        if let Some(path) = &self.dump_json {
            config.dump_json = Some(path.clone());
        }
    }
}
