use crate::error::{LifeError, Result};
use crate::simulation::buffer::GridBuffer;
use crate::simulation::grid::Grid;
use crate::simulation::parallel::{ComputeSubstrate, ParallelStepper, SubstrateKind};
use crate::simulation::patterns::Pattern;
use crate::simulation::stepper::{SequentialStepper, Stepper};

/// Driver lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Initialized,
    Running,
    Stopped,
}

/// Which stepper the driver builds when it starts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel(SubstrateKind),
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel(SubstrateKind::Gpu)
    }
}

impl ExecutionMode {
    /// Bring up the stepper, initializing the compute substrate if parallel
    pub fn build_stepper(self) -> Result<Box<dyn Stepper>> {
        Ok(match self {
            ExecutionMode::Sequential => Box::new(SequentialStepper::new()),
            ExecutionMode::Parallel(kind) => {
                let substrate = ComputeSubstrate::init(kind)?;
                log::info!("Parallel stepper on {}", substrate.describe());
                Box::new(ParallelStepper::new(substrate))
            }
        })
    }
}

/// Source of generation zero, consumed when the driver starts
#[derive(Clone, Debug, PartialEq)]
pub enum InitialPattern {
    /// Caller-provided grid; must match the driver's dimensions
    Supplied(Grid),
    /// Each cell alive with `probability`, reproducible from `seed`
    Random { probability: f64, seed: u64 },
    /// A named pattern with its top-left corner at (x, y) on a dead grid
    Pattern { pattern: Pattern, x: i64, y: i64 },
}

impl InitialPattern {
    /// Pattern centered on a grid of the given size
    pub fn centered(pattern: Pattern, width: u32, height: u32) -> Self {
        let (x, y) = pattern.centered_origin(width, height);
        InitialPattern::Pattern { pattern, x, y }
    }

    fn build(self, width: u32, height: u32) -> Result<Grid> {
        match self {
            InitialPattern::Supplied(grid) => Ok(grid),
            InitialPattern::Random { probability, seed } => {
                Grid::random(width, height, probability, seed)
            }
            InitialPattern::Pattern { pattern, x, y } => {
                let mut grid = Grid::new(width, height)?;
                pattern.stamp(&mut grid, x, y);
                Ok(grid)
            }
        }
    }
}

enum StepperSource {
    Mode(ExecutionMode),
    Provided(Box<dyn Stepper>),
    /// Substrate that never comes up
    #[cfg(test)]
    Unavailable(&'static str),
}

impl StepperSource {
    /// Bring up the stepper, handing the source back on failure so it can be retried
    fn build(self) -> std::result::Result<Box<dyn Stepper>, (StepperSource, LifeError)> {
        match self {
            StepperSource::Mode(mode) => {
                mode.build_stepper().map_err(|e| (StepperSource::Mode(mode), e))
            }
            StepperSource::Provided(stepper) => Ok(stepper),
            #[cfg(test)]
            StepperSource::Unavailable(reason) => Err((
                StepperSource::Unavailable(reason),
                LifeError::ComputeSubstrate(reason.into()),
            )),
        }
    }
}

/// Owns the grid buffers and advances the simulation one generation at a time.
///
/// Lifecycle: `Initialized` until the first `start`/`advance`, `Running`
/// while generations are computed, `Stopped` once released. Only the
/// current generation is ever exposed, and only while running.
pub struct SimulationDriver {
    width: u32,
    height: u32,
    state: DriverState,
    initial: Option<InitialPattern>,
    pending_stepper: Option<StepperSource>,
    stepper: Option<Box<dyn Stepper>>,
    buffers: Option<GridBuffer>,
    generation: u64,
}

impl SimulationDriver {
    /// Create a driver that builds its stepper from `mode` on start
    pub fn new(
        width: u32,
        height: u32,
        initial: InitialPattern,
        mode: ExecutionMode,
    ) -> Result<Self> {
        Self::build(width, height, initial, StepperSource::Mode(mode))
    }

    /// Create a driver around a ready-made stepper
    pub fn with_stepper(
        width: u32,
        height: u32,
        initial: InitialPattern,
        stepper: Box<dyn Stepper>,
    ) -> Result<Self> {
        Self::build(width, height, initial, StepperSource::Provided(stepper))
    }

    fn build(
        width: u32,
        height: u32,
        initial: InitialPattern,
        stepper: StepperSource,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::InvalidDimension { width, height });
        }
        match &initial {
            InitialPattern::Supplied(grid) if grid.dimensions() != (width, height) => {
                return Err(LifeError::DimensionMismatch {
                    expected: (width, height),
                    actual: grid.dimensions(),
                });
            }
            InitialPattern::Random { probability, .. } if !(0.0..=1.0).contains(probability) => {
                return Err(LifeError::InvalidProbability(*probability));
            }
            _ => {}
        }

        Ok(Self {
            width,
            height,
            state: DriverState::Initialized,
            initial: Some(initial),
            pending_stepper: Some(stepper),
            stepper: None,
            buffers: None,
            generation: 0,
        })
    }

    /// Initialized -> Running: bring up the stepper, allocate and seed buffers.
    ///
    /// On failure the driver stays `Initialized` and `start` may be retried.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            DriverState::Running => return Ok(()),
            DriverState::Stopped => {
                return Err(LifeError::InvalidState {
                    operation: "start",
                    state: self.state,
                })
            }
            DriverState::Initialized => {}
        }

        let stepper = match self.pending_stepper.take().map(StepperSource::build) {
            Some(Ok(stepper)) => stepper,
            Some(Err((source, e))) => {
                self.pending_stepper = Some(source);
                return Err(e);
            }
            None => {
                return Err(LifeError::InvalidState {
                    operation: "start without a stepper",
                    state: self.state,
                })
            }
        };

        let initial = self
            .initial
            .clone()
            .ok_or(LifeError::InvalidState {
                operation: "start without an initial pattern",
                state: self.state,
            })?
            .build(self.width, self.height);
        let buffers = match initial.and_then(GridBuffer::new) {
            Ok(buffers) => buffers,
            Err(e) => {
                self.pending_stepper = Some(StepperSource::Provided(stepper));
                return Err(e);
            }
        };

        log::info!(
            "Simulation started: {}x{} grid, {} stepper, {} live cells",
            self.width,
            self.height,
            stepper.name(),
            buffers.current().live_count()
        );

        self.initial = None;
        self.stepper = Some(stepper);
        self.buffers = Some(buffers);
        self.state = DriverState::Running;
        Ok(())
    }

    /// Compute the next generation and make it current.
    ///
    /// Returns the new generation number. A stepper failure is returned
    /// unchanged and leaves the current grid and generation as they were.
    pub fn advance(&mut self) -> Result<u64> {
        if self.state == DriverState::Initialized {
            self.start()?;
        }

        let (Some(stepper), Some(buffers)) = (self.stepper.as_mut(), self.buffers.as_mut()) else {
            return Err(LifeError::InvalidState {
                operation: "advance",
                state: self.state,
            });
        };

        let (current, next) = buffers.step_io();
        stepper.step(current, next)?;
        buffers.swap();
        self.generation += 1;

        log::trace!("generation {} complete", self.generation);
        Ok(self.generation)
    }

    /// Release buffers and the stepper's substrate. Idempotent.
    pub fn stop(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        self.buffers = None;
        self.stepper = None;
        self.pending_stepper = None;
        self.initial = None;
        self.state = DriverState::Stopped;
        log::info!("Simulation stopped after {} generations", self.generation);
    }

    /// Swap in another stepper, e.g. a sequential fallback after a substrate error
    pub fn set_stepper(&mut self, stepper: Box<dyn Stepper>) -> Result<()> {
        match self.state {
            DriverState::Initialized => {
                self.pending_stepper = Some(StepperSource::Provided(stepper));
            }
            DriverState::Running => {
                log::info!("Switching stepper to {}", stepper.name());
                self.stepper = Some(stepper);
            }
            DriverState::Stopped => {
                return Err(LifeError::InvalidState {
                    operation: "replace stepper",
                    state: self.state,
                })
            }
        }
        Ok(())
    }

    /// Replace the current grid without counting a generation
    pub fn reseed(&mut self, grid: Grid) -> Result<()> {
        match self.buffers.as_mut() {
            Some(buffers) => buffers.reseed(grid),
            None => Err(LifeError::InvalidState {
                operation: "reseed",
                state: self.state,
            }),
        }
    }

    /// Current generation, only while running
    pub fn current(&self) -> Option<&Grid> {
        self.buffers.as_ref().map(GridBuffer::current)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Name of the active stepper, if one has been brought up
    pub fn stepper_name(&self) -> Option<&'static str> {
        self.stepper.as_ref().map(|stepper| stepper.name())
    }
}

impl Drop for SimulationDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::cell::CellState;

    /// Fails every step without touching `next`
    struct FailingStepper;

    impl Stepper for FailingStepper {
        fn step(&mut self, _current: &Grid, _next: &mut Grid) -> Result<()> {
            Err(LifeError::ComputeSubstrate("device lost".into()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn random(probability: f64, seed: u64) -> InitialPattern {
        InitialPattern::Random { probability, seed }
    }

    fn sequential(initial: InitialPattern, width: u32, height: u32) -> SimulationDriver {
        SimulationDriver::new(width, height, initial, ExecutionMode::Sequential).unwrap()
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let initial = random(0.5, 1);
        assert!(matches!(
            SimulationDriver::new(0, 10, initial.clone(), ExecutionMode::Sequential),
            Err(LifeError::InvalidDimension { width: 0, height: 10 })
        ));
        assert!(matches!(
            SimulationDriver::new(10, 0, initial, ExecutionMode::Sequential),
            Err(LifeError::InvalidDimension { width: 10, height: 0 })
        ));
    }

    #[test]
    fn test_supplied_grid_must_match() {
        let grid = Grid::new(4, 4).unwrap();
        assert!(matches!(
            SimulationDriver::new(5, 4, InitialPattern::Supplied(grid), ExecutionMode::Sequential),
            Err(LifeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_lifecycle() {
        let mut driver = sequential(random(0.3, 5), 16, 16);
        assert_eq!(driver.state(), DriverState::Initialized);
        assert!(driver.current().is_none());

        driver.start().unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.current().unwrap(), &Grid::random(16, 16, 0.3, 5).unwrap());

        assert_eq!(driver.advance().unwrap(), 1);
        assert_eq!(driver.advance().unwrap(), 2);

        driver.stop();
        assert_eq!(driver.state(), DriverState::Stopped);
        assert!(driver.current().is_none());
        driver.stop();
    }

    #[test]
    fn test_advance_starts_implicitly() {
        let mut driver = sequential(InitialPattern::centered(Pattern::Block, 6, 6), 6, 6);
        assert_eq!(driver.advance().unwrap(), 1);
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.current().unwrap(), &Pattern::Block.centered(6, 6).unwrap());
    }

    #[test]
    fn test_advance_after_stop_fails() {
        let mut driver = sequential(random(0.5, 2), 8, 8);
        driver.advance().unwrap();
        driver.stop();
        let err = driver.advance().unwrap_err();
        assert_eq!(
            err,
            LifeError::InvalidState {
                operation: "advance",
                state: DriverState::Stopped
            }
        );
        assert_eq!(driver.generation(), 1);
        assert!(driver.start().is_err());
        assert!(driver.set_stepper(Box::new(SequentialStepper::new())).is_err());
    }

    #[test]
    fn test_stop_before_start() {
        let mut driver = sequential(random(0.5, 2), 8, 8);
        driver.stop();
        assert!(driver.advance().is_err());
        assert_eq!(driver.generation(), 0);
    }

    #[test]
    fn test_blinker_through_driver() {
        let horizontal = Grid::from_text(".....\n.....\n.OOO.\n.....\n.....").unwrap();
        let mut driver = sequential(InitialPattern::Supplied(horizontal.clone()), 5, 5);
        driver.advance().unwrap();
        assert_eq!(driver.current().unwrap().get(2, 1), CellState::Alive);
        assert_eq!(driver.current().unwrap().get(1, 2), CellState::Dead);
        driver.advance().unwrap();
        assert_eq!(driver.current().unwrap(), &horizontal);
    }

    #[test]
    fn test_failed_step_leaves_state_unchanged() {
        let initial = Grid::random(12, 12, 0.5, 77).unwrap();
        let mut driver = SimulationDriver::with_stepper(
            12,
            12,
            InitialPattern::Supplied(initial.clone()),
            Box::new(FailingStepper),
        )
        .unwrap();

        let err = driver.advance().unwrap_err();
        assert!(matches!(err, LifeError::ComputeSubstrate(_)));
        assert_eq!(driver.generation(), 0);
        assert_eq!(driver.current().unwrap(), &initial);
        assert_eq!(driver.state(), DriverState::Running);

        // Caller policy: fall back to sequential and carry on
        driver.set_stepper(Box::new(SequentialStepper::new())).unwrap();
        assert_eq!(driver.advance().unwrap(), 1);
        assert_eq!(driver.stepper_name(), Some("sequential"));
    }

    #[test]
    fn test_sequential_and_threads_drivers_agree() {
        let initial = random(0.4, 1234);
        let mut a = sequential(initial.clone(), 48, 31);
        let mut b = SimulationDriver::new(
            48,
            31,
            initial,
            ExecutionMode::Parallel(SubstrateKind::Threads { threads: Some(4) }),
        )
        .unwrap();

        for _ in 0..20 {
            assert_eq!(a.advance().unwrap(), b.advance().unwrap());
            assert_eq!(a.current(), b.current());
        }
        assert_eq!(b.stepper_name(), Some("parallel-threads"));
    }

    #[test]
    fn test_reseed_keeps_generation() {
        let mut driver = sequential(random(0.5, 3), 8, 8);
        assert!(driver.reseed(Grid::new(8, 8).unwrap()).is_err());
        driver.advance().unwrap();
        driver.reseed(Grid::new(8, 8).unwrap()).unwrap();
        assert_eq!(driver.generation(), 1);
        assert_eq!(driver.current().unwrap().live_count(), 0);
    }

    #[test]
    fn test_substrate_init_failure_keeps_driver_initialized() {
        let mut driver = SimulationDriver::build(
            8,
            8,
            random(0.5, 6),
            StepperSource::Unavailable("no adapter"),
        )
        .unwrap();

        let err = driver.start().unwrap_err();
        assert_eq!(err, LifeError::ComputeSubstrate("no adapter".into()));
        assert_eq!(driver.state(), DriverState::Initialized);
        assert_eq!(driver.generation(), 0);
        assert!(driver.current().is_none());

        // The pending source survives, so a retry fails the same way
        assert!(matches!(driver.advance(), Err(LifeError::ComputeSubstrate(_))));
        assert_eq!(driver.state(), DriverState::Initialized);

        driver.set_stepper(Box::new(SequentialStepper::new())).unwrap();
        assert_eq!(driver.advance(), Ok(1));
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.stepper_name(), Some("sequential"));
    }

    #[test]
    fn test_gpu_start_failure_is_recoverable() {
        let mut driver = SimulationDriver::new(
            16,
            16,
            random(0.5, 8),
            ExecutionMode::Parallel(SubstrateKind::Gpu),
        )
        .unwrap();

        match driver.start() {
            Ok(()) => assert_eq!(driver.stepper_name(), Some("parallel-gpu")),
            Err(e) => {
                assert!(matches!(e, LifeError::ComputeSubstrate(_)));
                assert_eq!(driver.state(), DriverState::Initialized);
                assert_eq!(driver.generation(), 0);
                driver.set_stepper(Box::new(SequentialStepper::new())).unwrap();
                assert_eq!(driver.advance(), Ok(1));
            }
        }
    }

    #[test]
    fn test_invalid_probability_rejected() {
        assert!(matches!(
            SimulationDriver::new(4, 4, random(-0.1, 0), ExecutionMode::Sequential),
            Err(LifeError::InvalidProbability(_))
        ));
    }
}
