use crate::simulation::{ExecutionMode, InitialPattern, Pattern, SubstrateKind};

/// Default grid dimensions for the windowed viewer (256x256 = 65K cells)
pub const GRID_WIDTH: u32 = 256;
pub const GRID_HEIGHT: u32 = 256;

/// Headless grid dimensions when stdout is not a terminal
pub const HEADLESS_WIDTH: u32 = 80;
pub const HEADLESS_HEIGHT: u32 = 23;

/// Generation limit for headless runs that cannot be quit with a key
pub const HEADLESS_GENERATIONS: u64 = 100;

/// Compute shader workgroup size (must match @workgroup_size in life.wgsl)
pub const WORKGROUP_SIZE: u32 = 16;

/// Probability that a randomly seeded cell starts alive
pub const DEFAULT_LIVE_PROBABILITY: f64 = 0.5;

// ============================================
// Windowed Viewer
// ============================================

/// Initial window size in logical pixels
pub const WINDOW_SIZE: u32 = 1024;

/// Window title prefix
pub const WINDOW_TITLE: &str = "Life Grid";

/// Delay between generations in the headless loop
pub const HEADLESS_FRAME_MILLIS: u64 = 50;

/// How the initial grid is produced
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Seeding {
    /// Uniform random cells with the given live probability
    Random { probability: f64, seed: u64 },
    /// A named pattern centered on an otherwise dead grid
    Pattern(Pattern),
}

/// Runtime configuration assembled by the command line
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    pub mode: ExecutionMode,
    pub seeding: Seeding,
    /// Stop after this many generations (None = run until closed)
    pub generations: Option<u64>,
    /// Switch to the sequential stepper when the substrate fails mid-run
    pub fallback: bool,
    pub headless: bool,
    /// Pause between generations in the headless loop
    pub frame_delay_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            mode: ExecutionMode::default(),
            seeding: Seeding::Random {
                probability: DEFAULT_LIVE_PROBABILITY,
                seed: 0,
            },
            generations: None,
            fallback: false,
            headless: false,
            frame_delay_ms: HEADLESS_FRAME_MILLIS,
        }
    }
}

impl SimConfig {
    /// Generation zero as the driver should build it
    pub fn initial_pattern(&self) -> InitialPattern {
        match self.seeding {
            Seeding::Random { probability, seed } => InitialPattern::Random { probability, seed },
            Seeding::Pattern(pattern) => InitialPattern::centered(pattern, self.width, self.height),
        }
    }

    /// Live probability used when reseeding randomly
    pub fn live_probability(&self) -> f64 {
        match self.seeding {
            Seeding::Random { probability, .. } => probability,
            Seeding::Pattern(_) => DEFAULT_LIVE_PROBABILITY,
        }
    }

    /// Label shown in status lines, mirroring the execution mode
    pub fn mode_label(&self) -> &'static str {
        match self.mode {
            ExecutionMode::Sequential => "<CPU Mode>",
            ExecutionMode::Parallel(SubstrateKind::Gpu) => "<GPU Mode>",
            ExecutionMode::Parallel(SubstrateKind::Threads { .. }) => "<Thread Pool Mode>",
        }
    }
}
