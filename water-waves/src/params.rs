//! Physical parameters of the surface and the stencil weights derived from them.

use crate::error::{Result, WaveError};
use crate::grid::Grid;

/// Five physical parameters plus the grid dimensions. All are required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub rows: usize,
    pub cols: usize,
    pub spatial_step: f64, // World units between adjacent samples
    pub time_step: f64,    // Fixed simulation step (seconds)
    pub wave_speed: f64,   // Propagation speed (world units / second)
    pub damping: f64,      // Damping coefficient (1 / second)
}

impl WaveParams {
    pub fn new(
        rows: usize,
        cols: usize,
        spatial_step: f64,
        time_step: f64,
        wave_speed: f64,
        damping: f64,
    ) -> Self {
        Self {
            rows,
            cols,
            spatial_step,
            time_step,
            wave_speed,
            damping,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows < 2 || self.cols < 2 {
            return Err(WaveError::invalid(
                "rows/cols",
                format!("grid must be at least 2x2, got {}x{}", self.rows, self.cols),
            ));
        }
        if !self.spatial_step.is_finite() || self.spatial_step <= 0.0 {
            return Err(WaveError::invalid(
                "spatial_step",
                format!("must be positive, got {}", self.spatial_step),
            ));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(WaveError::invalid(
                "time_step",
                format!("must be positive, got {}", self.time_step),
            ));
        }
        if !self.wave_speed.is_finite() {
            return Err(WaveError::invalid(
                "wave_speed",
                format!("must be finite, got {}", self.wave_speed),
            ));
        }
        if !self.damping.is_finite() || self.damping < 0.0 {
            return Err(WaveError::invalid(
                "damping",
                format!("must be non-negative, got {}", self.damping),
            ));
        }
        Ok(())
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.rows, self.cols, self.spatial_step)
    }

    /// Courant-like term `(speed * dt / dx)^2`.
    pub fn courant(&self) -> f64 {
        let c = self.wave_speed * self.time_step / self.spatial_step;
        c * c
    }

    /// The explicit 5-point scheme stays bounded while `speed * dt / dx <= 1/sqrt(2)`.
    pub fn is_stable(&self) -> bool {
        self.courant() <= 0.5
    }

    /// Largest time step that keeps the scheme stable for this speed and spacing.
    pub fn max_stable_time_step(&self) -> f64 {
        if self.wave_speed == 0.0 {
            return f64::INFINITY;
        }
        self.spatial_step / (self.wave_speed.abs() * std::f64::consts::SQRT_2)
    }
}

/// Weights of the damped wave update
/// `h[n+1] = k1 * h[n-1] + k2 * h[n] + k3 * (sum of the 4 neighbours of h[n])`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilCoefficients {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
}

impl StencilCoefficients {
    pub fn from_params(params: &WaveParams) -> Self {
        let dt = params.time_step;
        let d = params.damping * dt + 2.0;
        let e = params.courant();

        Self {
            k1: (params.damping * dt - 2.0) / d,
            k2: (4.0 - 8.0 * e) / d,
            k3: (2.0 * e) / d,
        }
    }

    /// `k1 + k2 + 4 * k3`. Always 1, so a flat surface stays flat.
    pub fn sum(&self) -> f64 {
        self.k1 + self.k2 + 4.0 * self.k3
    }
}
