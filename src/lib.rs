//! Conway's Game of Life on a toroidal grid.
//!
//! A [`SimulationDriver`](simulation::SimulationDriver) owns a pair of grid
//! buffers and advances them one generation at a time with either a
//! sequential stepper or a parallel one backed by a GPU compute shader or a
//! CPU thread pool. Both steppers produce identical grids.

pub mod config;
pub mod error;
pub mod gpu;
pub mod simulation;

pub use error::{LifeError, Result};
