/// State of a single cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellState {
    #[default]
    Dead,
    Alive,
}

impl CellState {
    pub fn is_alive(self) -> bool {
        self == CellState::Alive
    }
}

impl From<bool> for CellState {
    fn from(alive: bool) -> Self {
        if alive {
            CellState::Alive
        } else {
            CellState::Dead
        }
    }
}

/// GPU-compatible cell storage.
///
/// Layout: 4 bytes. WGSL storage buffers have no byte-addressable type, so
/// each cell occupies one `u32` word on both host and device:
/// - state: 0 = dead, 1 = alive
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuCell {
    pub state: u32,
}

impl GpuCell {
    pub const DEAD: GpuCell = GpuCell { state: 0 };
    pub const ALIVE: GpuCell = GpuCell { state: 1 };

    pub fn new(state: CellState) -> Self {
        match state {
            CellState::Dead => Self::DEAD,
            CellState::Alive => Self::ALIVE,
        }
    }

    /// Any non-zero word reads as alive
    pub fn state(self) -> CellState {
        CellState::from(self.state != 0)
    }
}

impl From<CellState> for GpuCell {
    fn from(state: CellState) -> Self {
        GpuCell::new(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size() {
        assert_eq!(std::mem::size_of::<GpuCell>(), 4);
    }

    #[test]
    fn test_state_conversion() {
        assert_eq!(GpuCell::new(CellState::Alive).state(), CellState::Alive);
        assert_eq!(GpuCell::new(CellState::Dead).state(), CellState::Dead);
        assert_eq!(GpuCell::from(CellState::Alive), GpuCell::ALIVE);
    }

    #[test]
    fn test_nonzero_word_is_alive() {
        assert!(GpuCell { state: 7 }.state().is_alive());
    }

    #[test]
    fn test_zeroed_cell_is_dead() {
        let cell: GpuCell = bytemuck::Zeroable::zeroed();
        assert_eq!(cell.state(), CellState::Dead);
    }
}
