use crate::error::Result;
use crate::simulation::grid::Grid;

/// Host-side ping-pong pair: `current` is read, `next` is written
pub struct GridBuffer {
    current: Grid,
    next: Grid,
}

impl GridBuffer {
    /// Seed `current` with the initial grid and allocate a dead `next` of the same size
    pub fn new(initial: Grid) -> Result<Self> {
        let next = Grid::new(initial.width(), initial.height())?;
        Ok(Self {
            current: initial,
            next,
        })
    }

    pub fn current(&self) -> &Grid {
        &self.current
    }

    /// Split borrow handed to a stepper: read-only snapshot and exclusive output
    pub fn step_io(&mut self) -> (&Grid, &mut Grid) {
        (&self.current, &mut self.next)
    }

    /// Output becomes input for the next generation
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Replace `current`, keeping the buffer pair's dimensions
    pub fn reseed(&mut self, grid: Grid) -> Result<()> {
        self.current.ensure_same_dimensions(&grid)?;
        self.current = grid;
        Ok(())
    }
}
