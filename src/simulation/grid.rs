use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{LifeError, Result};
use crate::simulation::cell::{CellState, GpuCell};

/// Fixed-size grid of cells stored row-major (`index = y * width + x`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<GpuCell>,
}

impl Grid {
    /// Create an all-dead grid
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let cell_count = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![GpuCell::DEAD; cell_count],
        })
    }

    /// Wrap existing row-major cell data
    pub fn from_cells(width: u32, height: u32, cells: Vec<GpuCell>) -> Result<Self> {
        let expected = cell_count(width, height)?;
        if cells.len() != expected {
            return Err(LifeError::CellCount {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from a boolean matrix, one inner slice per row
    pub fn from_rows<R: AsRef<[bool]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.as_ref().len()) as u32;
        let mut grid = Self::new(width, height)?;

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width as usize {
                return Err(LifeError::DimensionMismatch {
                    expected: (width, height),
                    actual: (row.len() as u32, height),
                });
            }
            for (x, &alive) in row.iter().enumerate() {
                grid.set(x as u32, y as u32, CellState::from(alive));
            }
        }

        Ok(grid)
    }

    /// Parse a text picture: `O`, `o`, `#` or `*` are alive, anything else dead.
    /// Lines are padded with dead cells to the longest line.
    pub fn from_text(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        let rows: Vec<Vec<bool>> = lines
            .iter()
            .map(|line| {
                let mut row: Vec<bool> = line
                    .chars()
                    .map(|c| matches!(c, 'O' | 'o' | '#' | '*'))
                    .collect();
                row.resize(width, false);
                row
            })
            .collect();
        Self::from_rows(&rows)
    }

    /// Create a grid where each cell is alive with the given probability.
    /// The same seed always yields the same grid.
    pub fn random(width: u32, height: u32, probability: f64, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(LifeError::InvalidProbability(probability));
        }

        let mut grid = Self::new(width, height)?;
        let mut rng = StdRng::seed_from_u64(seed);
        for cell in &mut grid.cells {
            *cell = GpuCell::new(CellState::from(rng.gen_bool(probability)));
        }

        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Flat index of an in-range coordinate
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.width as usize + x as usize
    }

    /// Coordinate of a flat index
    #[inline]
    pub fn coordinate(&self, index: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> CellState {
        self.cells[self.index(x, y)].state()
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, state: CellState) {
        let index = self.index(x, y);
        self.cells[index] = GpuCell::new(state);
    }

    /// Set a cell at a coordinate wrapped onto the torus
    pub fn set_wrapped(&mut self, x: i64, y: i64, state: CellState) {
        let x = x.rem_euclid(self.width as i64) as u32;
        let y = y.rem_euclid(self.height as i64) as u32;
        self.set(x, y, state);
    }

    pub fn cells(&self) -> &[GpuCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [GpuCell] {
        &mut self.cells
    }

    /// Raw bytes for device upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.state().is_alive()).count()
    }

    /// Boolean matrix view, one `Vec` per row
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| row.iter().map(|cell| cell.state().is_alive()).collect())
            .collect()
    }

    /// Fail unless `other` has the same dimensions
    pub fn ensure_same_dimensions(&self, other: &Grid) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(LifeError::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }
}

/// Renders alive cells as `O` and dead cells as spaces, one line per row
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.cells.chunks(self.width as usize).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for cell in row {
                f.write_str(if cell.state().is_alive() { "O" } else { " " })?;
            }
        }
        Ok(())
    }
}

fn cell_count(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(LifeError::InvalidDimension { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(LifeError::InvalidDimension { width, height })
}
