// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver configuration.
//!
//! Settings are stored as RON next to the working directory. A missing
//! file falls back to defaults; a file written by a newer format version is
//! rejected.

use beatplay_graph::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "beatplay.ron";

/// Upper bound on frames evaluated in one run
pub const MAX_FRAME_COUNT: usize = 10_000_000;

/// Configuration load / save errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON for this format
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },

    /// Settings are out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Settings format version
    pub version: u32,
    /// Engine settings
    pub engine: EngineConfig,
    /// First evaluated time in seconds
    pub start_time: f32,
    /// Last evaluated time in seconds
    pub end_time: f32,
    /// Frames per second
    pub frame_rate: f32,
    /// Prefab instances placed in the demo scene
    pub demo_instances: usize,
    /// Write every evaluated frame as JSON here
    pub dump_json: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            engine: EngineConfig::default(),
            start_time: 0.0,
            end_time: 10.0,
            frame_rate: 60.0,
            demo_instances: 32,
            dump_json: None,
        }
    }
}

impl AppConfig {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load settings, falling back to defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse settings from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        let config: AppConfig = ron::from_str(content)?;

        // Version check
        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the time range and frame rate
    pub fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "time range {}..{} is not finite",
                self.start_time, self.end_time
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate < 0.0 {
            return Err(ConfigError::Invalid(format!("frame rate {}", self.frame_rate)));
        }
        let frames = f64::from(self.end_time - self.start_time) * f64::from(self.frame_rate);
        if frames > MAX_FRAME_COUNT as f64 {
            return Err(ConfigError::Invalid(format!(
                "{frames:.0} frames exceeds the limit of {MAX_FRAME_COUNT}"
            )));
        }
        Ok(())
    }

    /// Serialize settings as pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Evaluated times from start to end at the frame rate
    pub fn frame_times(&self) -> impl Iterator<Item = f32> {
        let start = self.start_time;
        let rate = self.frame_rate;
        let count = if rate > 0.0 && self.end_time >= start {
            (((self.end_time - start) * rate).floor() as usize).min(MAX_FRAME_COUNT) + 1
        } else {
            1
        };
        (0..count).map(move |i| start + i as f32 / rate.max(f32::EPSILON))
    }
}
