use thiserror::Error;

use crate::simulation::DriverState;

/// Errors surfaced by the simulation core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifeError {
    /// Grid constructed with a zero width or height
    #[error("invalid grid dimensions {width}x{height}: both must be non-zero")]
    InvalidDimension { width: u32, height: u32 },

    /// Operation not permitted in the driver's current state
    #[error("cannot {operation} while driver is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: DriverState,
    },

    /// Parallel execution environment unavailable or a transfer failed
    #[error("compute substrate error: {0}")]
    ComputeSubstrate(String),

    /// Two grids that must share dimensions do not
    #[error("grid dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Flat cell data whose length does not fill the grid
    #[error("cell count mismatch: expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },

    /// Window, terminal or event loop failure in a front end
    #[error("display error: {0}")]
    Display(String),

    /// Live-cell probability outside [0, 1]
    #[error("live-cell probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
}

pub type Result<T> = std::result::Result<T, LifeError>;
