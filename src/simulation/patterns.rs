use crate::error::Result;
use crate::simulation::cell::CellState;
use crate::simulation::grid::Grid;

/// Well-known starting patterns
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Pattern {
    /// Period-2 oscillator
    Blinker,
    /// 2x2 still life
    Block,
    /// Period-2 oscillator
    Toad,
    /// Period-2 oscillator
    Beacon,
    /// Spaceship moving one cell diagonally every 4 generations
    Glider,
    /// Methuselah that settles after 1103 generations
    RPentomino,
    /// Gosper's gun, emits a glider every 30 generations
    GliderGun,
}

/// Gosper glider gun in a 36x9 bounding box
#[rustfmt::skip]
const GLIDER_GUN: &[(u32, u32)] = &[
    // Left block
    (0, 4), (0, 5), (1, 4), (1, 5),
    // Left ship
    (10, 4), (10, 5), (10, 6),
    (11, 3), (11, 7),
    (12, 2), (12, 8),
    (13, 2), (13, 8),
    (14, 5),
    (15, 3), (15, 7),
    (16, 4), (16, 5), (16, 6),
    (17, 5),
    // Right ship
    (20, 2), (20, 3), (20, 4),
    (21, 2), (21, 3), (21, 4),
    (22, 1), (22, 5),
    (24, 0), (24, 1), (24, 5), (24, 6),
    // Right block
    (34, 2), (34, 3), (35, 2), (35, 3),
];

impl Pattern {
    /// Live cells as (x, y) offsets from the pattern's top-left corner
    pub fn cells(self) -> &'static [(u32, u32)] {
        match self {
            Pattern::Blinker => &[(0, 0), (1, 0), (2, 0)],
            Pattern::Block => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Pattern::Toad => &[(1, 0), (2, 0), (3, 0), (0, 1), (1, 1), (2, 1)],
            Pattern::Beacon => &[(0, 0), (1, 0), (0, 1), (3, 2), (2, 3), (3, 3)],
            Pattern::Glider => &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)],
            Pattern::RPentomino => &[(1, 0), (2, 0), (0, 1), (1, 1), (1, 2)],
            Pattern::GliderGun => GLIDER_GUN,
        }
    }

    /// Width and height of the pattern's bounding box
    pub fn size(self) -> (u32, u32) {
        self.cells()
            .iter()
            .fold((0, 0), |(w, h), &(x, y)| (w.max(x + 1), h.max(y + 1)))
    }

    /// Set the pattern's cells alive with its top-left corner at (x, y),
    /// wrapping around the grid edges
    pub fn stamp(self, grid: &mut Grid, x: i64, y: i64) {
        for &(dx, dy) in self.cells() {
            grid.set_wrapped(x + dx as i64, y + dy as i64, CellState::Alive);
        }
    }

    /// Top-left corner that centers the pattern on a `width` x `height` grid.
    /// Negative when the pattern is larger than the grid; stamping wraps.
    pub fn centered_origin(self, width: u32, height: u32) -> (i64, i64) {
        let (w, h) = self.size();
        (
            (i64::from(width) - i64::from(w)) / 2,
            (i64::from(height) - i64::from(h)) / 2,
        )
    }

    /// A dead grid with the pattern centered on it
    pub fn centered(self, width: u32, height: u32) -> Result<Grid> {
        let mut grid = Grid::new(width, height)?;
        let (x, y) = self.centered_origin(width, height);
        self.stamp(&mut grid, x, y);
        Ok(grid)
    }
}
