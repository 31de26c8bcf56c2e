//! Error type for the wave engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WaveError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveError {
    /// A construction parameter describes a degenerate grid or time step.
    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// A disturbance must sit at least two cells away from every edge.
    #[error(
        "disturbance at ({row}, {col}) is outside the interior of a {rows}x{cols} grid \
         (need 1 < row < {rows}-2 and 1 < col < {cols}-2)"
    )]
    DisturbanceOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// The grid has more vertices than a 16-bit index buffer can address.
    #[error("{vertex_count} vertices exceed the 16-bit index limit of {limit}")]
    IndexOverflow { vertex_count: usize, limit: usize },
}

impl WaveError {
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        WaveError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
