use std::time::Instant;

use crate::error::Result;
use crate::simulation::cell::GpuCell;
use crate::simulation::grid::Grid;
use crate::simulation::rules::evolve_cell;

/// One generation of the automaton: read `current`, write every cell of `next`.
///
/// Implementations must only read `current` and must leave `next` untouched
/// when they return an error.
pub trait Stepper: Send {
    fn step(&mut self, current: &Grid, next: &mut Grid) -> Result<()>;

    /// Short name for logs and status lines
    fn name(&self) -> &'static str;
}

/// Single-threaded row-major stepper
#[derive(Debug, Default)]
pub struct SequentialStepper;

impl SequentialStepper {
    pub fn new() -> Self {
        Self
    }
}

impl Stepper for SequentialStepper {
    fn step(&mut self, current: &Grid, next: &mut Grid) -> Result<()> {
        current.ensure_same_dimensions(next)?;
        let start = Instant::now();

        for y in 0..current.height() {
            for x in 0..current.width() {
                let index = current.index(x, y);
                next.cells_mut()[index] = GpuCell::new(evolve_cell(current, x, y));
            }
        }

        log::debug!("sequential step took {:?}", start.elapsed());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Run a stepper into a fresh grid
pub fn step_once(stepper: &mut dyn Stepper, current: &Grid) -> Result<Grid> {
    let mut next = Grid::new(current.width(), current.height())?;
    stepper.step(current, &mut next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifeError;
    use crate::simulation::cell::CellState;

    fn run(grid: &Grid, generations: usize) -> Grid {
        let mut stepper = SequentialStepper::new();
        let mut grid = grid.clone();
        for _ in 0..generations {
            grid = step_once(&mut stepper, &grid).unwrap();
        }
        grid
    }

    #[test]
    fn test_block_is_still_life() {
        let block = Grid::from_text("......\n..OO..\n..OO..\n......\n......").unwrap();
        assert_eq!(run(&block, 1), block);
        assert_eq!(run(&block, 5), block);
    }

    #[test]
    fn test_blinker_period_two() {
        let horizontal = Grid::from_text(".....\n.....\n.OOO.\n.....\n.....").unwrap();
        let vertical = Grid::from_text(".....\n..O..\n..O..\n..O..\n.....").unwrap();
        assert_eq!(run(&horizontal, 1), vertical);
        assert_eq!(run(&horizontal, 2), horizontal);
    }

    #[test]
    fn test_glider_wraps_torus() {
        let glider = Grid::from_text(".O....\n..O...\nOOO...\n......\n......\n......").unwrap();
        // Four generations move a glider one cell down-right; 24 bring it home on a 6x6 torus
        let moved = run(&glider, 4);
        assert_eq!(moved.live_count(), 5);
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(moved.get((x + 1) % 6, (y + 1) % 6), glider.get(x, y));
            }
        }
        assert_eq!(run(&glider, 24), glider);
    }

    #[test]
    fn test_lonely_cell_dies() {
        let mut grid = Grid::new(5, 5).unwrap();
        grid.set(2, 2, CellState::Alive);
        assert_eq!(run(&grid, 1).live_count(), 0);
    }

    #[test]
    fn test_deterministic() {
        let grid = Grid::random(40, 30, 0.4, 9).unwrap();
        assert_eq!(run(&grid, 3), run(&grid, 3));
    }

    #[test]
    fn test_mismatched_output_rejected() {
        let current = Grid::new(4, 4).unwrap();
        let mut next = Grid::new(4, 5).unwrap();
        let before = next.clone();
        let result = SequentialStepper::new().step(&current, &mut next);
        assert!(matches!(result, Err(LifeError::DimensionMismatch { .. })));
        assert_eq!(next, before);
    }

    #[test]
    fn test_every_cell_overwritten() {
        let current = Grid::new(6, 6).unwrap();
        let mut next = Grid::random(6, 6, 1.0, 0).unwrap();
        SequentialStepper::new().step(&current, &mut next).unwrap();
        assert_eq!(next.live_count(), 0);
    }
}
