mod buffer;
mod cell;
mod driver;
mod grid;
mod parallel;
mod patterns;
pub mod rules;
mod stepper;

pub use buffer::GridBuffer;
pub use cell::{CellState, GpuCell};
pub use driver::{DriverState, ExecutionMode, InitialPattern, SimulationDriver};
pub use grid::Grid;
pub use parallel::{ComputeSubstrate, ParallelStepper, SubstrateKind};
pub use patterns::Pattern;
pub use rules::{count_live_neighbors, next_state};
pub use stepper::{step_once, SequentialStepper, Stepper};
