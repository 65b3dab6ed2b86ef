pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod recording;
pub mod utils;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::DepthUpperBound;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "RGBD";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub depth: DepthConfig,
    pub recording: RecordingConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub color_width: u32,
    pub color_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    /// Arrival rate of the synthetic sensor; 0 means arrivals are triggered by hand
    pub fps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    pub upper_bound: DepthUpperBound,
    /// Overrides the sensor's reliable minimum
    pub min_depth: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub output_dir: PathBuf,
    pub color_dir: String,
    pub depth_dir: String,
    /// Delete frames left over from a previous run at startup
    pub clear_on_start: bool,
    /// Frames the background writer may hold before new ones are dropped
    pub writer_queue: usize,
    pub start_recording: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub preview_frames: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            color_width: 1920,
            color_height: 1080,
            depth_width: 512,
            depth_height: 424,
            fps: 30,
        }
    }
}

impl SensorConfig {
    /// Whether the sensor emits arrivals on its own clock
    pub fn is_free_running(&self) -> bool {
        self.fps > 0
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            color_dir: "rgb".into(),
            depth_dir: "d".into(),
            clear_on_start: true,
            writer_queue: 64,
            start_recording: false,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { preview_frames: 4 }
    }
}

impl Config {
    /// Layer an optional TOML file and `RGBD_*` environment variables over the
    /// defaults. Nested keys use `__`, e.g. `RGBD_SENSOR__FPS=15`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
