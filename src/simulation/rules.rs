//! Conway's B3/S23 rule and toroidal neighbor counting.
//!
//! Both functions are pure and only read their inputs, so any number of
//! callers may evaluate different cells against the same snapshot at once.

use crate::simulation::cell::CellState;
use crate::simulation::grid::Grid;

/// The eight (dx, dy) offsets surrounding a cell
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Count live cells among the eight toroidal neighbors of (x, y).
///
/// Each offset is counted on its own, so on grids narrower or shorter than
/// three cells a single cell may be counted more than once.
pub fn count_live_neighbors(grid: &Grid, x: u32, y: u32) -> u8 {
    let (width, height) = (grid.width() as i64, grid.height() as i64);
    NEIGHBOR_OFFSETS
        .iter()
        .filter(|&&(dx, dy)| {
            let nx = (x as i64 + dx as i64 + width) % width;
            let ny = (y as i64 + dy as i64 + height) % height;
            grid.get(nx as u32, ny as u32).is_alive()
        })
        .count() as u8
}

/// Next state of a cell given its live neighbor count
#[inline]
pub fn next_state(current: CellState, live_neighbors: u8) -> CellState {
    match (current, live_neighbors) {
        (CellState::Alive, 2 | 3) => CellState::Alive,
        (CellState::Dead, 3) => CellState::Alive,
        _ => CellState::Dead,
    }
}

/// Next state of the cell at (x, y) in `grid`
#[inline]
pub fn evolve_cell(grid: &Grid, x: u32, y: u32) -> CellState {
    next_state(grid.get(x, y), count_live_neighbors(grid, x, y))
}
