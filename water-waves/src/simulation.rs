//! Headless per-frame driver: the role a render loop plays around a `WaveField`.

use crate::config::Config;
use crate::surface::{self, SurfaceVertex};
use crate::wavefield::WaveField;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splash {
    pub row: usize,
    pub col: usize,
    pub magnitude: f64,
}

/// Places random splashes on a fixed real-time interval.
pub struct SplashSource {
    interval: f64,
    min_magnitude: f64,
    max_magnitude: f64,
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
    timer: f64,
}

impl SplashSource {
    pub fn new(config: &Config) -> Result<Self> {
        // Rejects margins that leave no room for a splash
        config.validate()?;

        // A margin below 2 would put the splash ring on the fixed boundary
        let margin = config.disturbance.margin.max(2);
        Ok(Self {
            interval: config.disturbance.interval,
            min_magnitude: config.disturbance.min_magnitude,
            max_magnitude: config.disturbance.max_magnitude,
            rows: margin..config.grid.rows - margin,
            cols: margin..config.grid.cols - margin,
            timer: 0.0,
        })
    }

    /// Advance the timer and return a splash when one is due.
    pub fn tick(&mut self, delta_time: f64, rng: &mut impl Rng) -> Option<Splash> {
        self.timer += delta_time;
        if self.timer < self.interval {
            return None;
        }
        self.timer = 0.0;

        Some(Splash {
            row: rng.gen_range(self.rows.clone()),
            col: rng.gen_range(self.cols.clone()),
            magnitude: rng.gen_range(self.min_magnitude..=self.max_magnitude),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    pub frames: usize,
    pub steps: u64,
    pub splashes: usize,
    pub wall_time: f64,
    pub max_height: f64,
}

pub struct Simulation {
    pub config: Config,
    pub field: WaveField,
    pub vertices: Vec<SurfaceVertex>,
    splashes: SplashSource,
    rng: StdRng,
    summary: RunSummary,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let field = WaveField::new(config.wave_params())?;
        let splashes = SplashSource::new(&config)?;
        let rng = StdRng::seed_from_u64(config.run.seed);
        let mut vertices = Vec::with_capacity(field.vertex_count());
        surface::write_vertices(&field, &mut vertices);

        Ok(Self {
            config,
            field,
            vertices,
            splashes,
            rng,
            summary: RunSummary::default(),
        })
    }

    /// One host frame: maybe splash, advance the surface, refresh vertices.
    pub fn frame(&mut self, delta_time: f64) -> Result<()> {
        if let Some(splash) = self.splashes.tick(delta_time, &mut self.rng) {
            debug!(
                row = splash.row,
                col = splash.col,
                magnitude = splash.magnitude,
                "splash"
            );
            self.field.disturb(splash.row, splash.col, splash.magnitude)?;
            self.summary.splashes += 1;
        }

        if self.field.update(delta_time) {
            self.summary.steps += 1;
        }

        surface::write_vertices(&self.field, &mut self.vertices);

        self.summary.frames += 1;
        self.summary.wall_time += delta_time;
        self.summary.max_height = self.summary.max_height.max(self.field.max_abs_height());
        Ok(())
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let run = self.config.run.clone();
        info!("Starting simulation...");

        for frame in 1..=run.frames {
            let delta_time = if run.frame_time_max > run.frame_time_min {
                self.rng.gen_range(run.frame_time_min..run.frame_time_max)
            } else {
                run.frame_time_min
            };
            self.frame(delta_time)?;

            if frame % run.report_period == 0 {
                info!(
                    "Frame {}/{} (steps={}, t_sim={:.3}s, max|h|={:.4}, energy={:.5})",
                    frame,
                    run.frames,
                    self.field.step_count(),
                    self.field.simulated_time(),
                    self.field.max_abs_height(),
                    self.field.discrete_energy()
                );
            }
        }

        info!(
            "Simulation complete: {} frames, {} steps, {} splashes over {:.2}s",
            self.summary.frames, self.summary.steps, self.summary.splashes, self.summary.wall_time
        );
        Ok(self.summary)
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }
}
