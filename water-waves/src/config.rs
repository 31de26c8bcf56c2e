use crate::params::WaveParams;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    pub spatial_step: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 128,
            cols: 128,
            spatial_step: 1.0,
        }
    }
}

/// Physical parameters of the surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub time_step: f64,  // Fixed simulation step (s)
    pub wave_speed: f64, // World units per second
    pub damping: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            time_step: 0.03,
            wave_speed: 4.0,
            damping: 0.2,
        }
    }
}

/// Random splash policy used by the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisturbanceConfig {
    #[serde(default = "default_interval")]
    pub interval: f64, // Real seconds between splashes
    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,
    #[serde(default = "default_max_magnitude")]
    pub max_magnitude: f64,
    #[serde(default = "default_margin")]
    pub margin: usize, // Cells kept clear of each edge
}

fn default_interval() -> f64 {
    0.25
}

fn default_min_magnitude() -> f64 {
    0.2
}

fn default_max_magnitude() -> f64 {
    0.5
}

fn default_margin() -> usize {
    5
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            min_magnitude: default_min_magnitude(),
            max_magnitude: default_max_magnitude(),
            margin: default_margin(),
        }
    }
}

impl DisturbanceConfig {
    fn validate(&self, grid: &GridConfig) -> Result<()> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(anyhow!("disturbance interval must be positive, got {}", self.interval));
        }
        if !self.min_magnitude.is_finite() || !self.max_magnitude.is_finite() {
            return Err(anyhow!("splash magnitudes must be finite"));
        }
        if self.min_magnitude > self.max_magnitude {
            return Err(anyhow!(
                "min_magnitude must not exceed max_magnitude ({} > {})",
                self.min_magnitude,
                self.max_magnitude
            ));
        }
        // Splashes need 1 < i < n-2 after the margin is applied
        let margin = self.margin.max(2);
        if grid.rows < 2 * margin + 1 || grid.cols < 2 * margin + 1 {
            return Err(anyhow!(
                "grid {}x{} is too small for a disturbance margin of {}",
                grid.rows,
                grid.cols,
                margin
            ));
        }
        Ok(())
    }
}

/// Frame loop settings for the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_frames")]
    pub frames: usize,
    #[serde(default = "default_frame_time_min")]
    pub frame_time_min: f64,
    #[serde(default = "default_frame_time_max")]
    pub frame_time_max: f64,
    #[serde(default = "default_report_period")]
    pub report_period: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_frames() -> usize {
    600
}

fn default_frame_time_min() -> f64 {
    1.0 / 60.0
}

fn default_frame_time_max() -> f64 {
    1.0 / 30.0
}

fn default_report_period() -> usize {
    60
}

fn default_seed() -> u64 {
    7
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            frame_time_min: default_frame_time_min(),
            frame_time_max: default_frame_time_max(),
            report_period: default_report_period(),
            seed: default_seed(),
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        if self.frame_time_min.is_nan()
            || self.frame_time_min < 0.0
            || !self.frame_time_max.is_finite()
            || self.frame_time_min > self.frame_time_max
        {
            return Err(anyhow!(
                "frame times must satisfy 0 <= min <= max (min={}, max={})",
                self.frame_time_min,
                self.frame_time_max
            ));
        }
        if self.report_period == 0 {
            return Err(anyhow!("report_period must be positive"));
        }
        Ok(())
    }
}

/// Complete driver configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub disturbance: DisturbanceConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        // Validate before returning
        config.validate()?;

        Ok(config)
    }

    pub fn wave_params(&self) -> WaveParams {
        WaveParams::new(
            self.grid.rows,
            self.grid.cols,
            self.grid.spatial_step,
            self.physics.time_step,
            self.physics.wave_speed,
            self.physics.damping,
        )
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.wave_params().validate()?;
        self.disturbance.validate(&self.grid)?;
        self.run.validate()?;

        Ok(())
    }

    pub fn log_summary(&self) {
        let params = self.wave_params();
        info!(
            "grid {}x{} (dx={}, {} x {} units)",
            self.grid.rows,
            self.grid.cols,
            self.grid.spatial_step,
            self.grid.cols as f64 * self.grid.spatial_step,
            self.grid.rows as f64 * self.grid.spatial_step
        );
        info!(
            "physics: dt={} s, speed={}, damping={}, courant={:.4} (stable: {})",
            self.physics.time_step,
            self.physics.wave_speed,
            self.physics.damping,
            params.courant(),
            params.is_stable()
        );
        info!(
            "splashes every {} s, magnitude {}..{}, margin {}",
            self.disturbance.interval,
            self.disturbance.min_magnitude,
            self.disturbance.max_magnitude,
            self.disturbance.margin
        );
        info!(
            "run: {} frames, frame time {:.4}..{:.4} s, seed {}",
            self.run.frames, self.run.frame_time_min, self.run.frame_time_max, self.run.seed
        );
    }
}
