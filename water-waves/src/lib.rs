//! Real-time water surface simulation.
//!
//! A fixed `rows x cols` height field is advanced with an explicit
//! finite-difference scheme for the damped wave equation
//! `d2h/dt2 + damping * dh/dt = speed^2 * laplacian(h)`.
//! Callers feed frame times to [`WaveField::update`], drop splashes with
//! [`WaveField::disturb`] and read positions and normals back by index.
//!
//! ```
//! use water_waves::{WaveField, WaveParams};
//!
//! let mut field = WaveField::new(WaveParams::new(64, 64, 1.0, 0.03, 4.0, 0.2))?;
//! field.disturb(32, 32, 0.5)?;
//! field.update(1.0 / 30.0);
//! let crest = field.position(32 * 64 + 32);
//! assert!(crest.y > 0.5);
//! # Ok::<(), water_waves::WaveError>(())
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod params;
pub mod simulation;
pub mod surface;
pub mod wavefield;

pub use config::Config;
pub use error::{Result, WaveError};
pub use grid::Grid;
pub use params::{StencilCoefficients, WaveParams};
pub use simulation::{RunSummary, Simulation};
pub use surface::SurfaceVertex;
pub use wavefield::WaveField;
