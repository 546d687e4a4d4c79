//! Life Grid CLI
//!
//! Runs Conway's Game of Life on a toroidal grid, stepping every cell in
//! parallel on the GPU by default.
//!
//! # Example
//!
//! ```bash
//! # Windowed, GPU compute, random 256x256 grid
//! life-grid
//!
//! # Terminal output sized to the terminal, single-threaded, reproducible
//! life-grid --headless --cpu --seed 42
//!
//! # Thread-pool substrate starting from a glider gun
//! life-grid --substrate threads --pattern glider-gun --width 120 --height 60
//! ```

use std::process::ExitCode;

use clap::Parser;

use life_grid::config::{
    Seeding, SimConfig, DEFAULT_LIVE_PROBABILITY, GRID_HEIGHT, GRID_WIDTH, HEADLESS_FRAME_MILLIS,
    HEADLESS_GENERATIONS, HEADLESS_HEIGHT, HEADLESS_WIDTH,
};
use life_grid::simulation::{
    ExecutionMode, Pattern, SequentialStepper, SimulationDriver, SubstrateKind,
};
use life_grid::{LifeError, Result};

mod app;
mod headless;

/// Parallel execution environment
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum SubstrateArg {
    /// wgpu compute shader
    Gpu,
    /// CPU thread pool
    Threads,
}

/// Life Grid
///
/// Conway's Game of Life with a parallel GPU stepper and a sequential
/// fallback that produce identical generations.
#[derive(Parser, Debug)]
#[command(name = "life-grid")]
#[command(version, about, long_about = None)]
struct Args {
    /// Run the sequential (single-threaded) stepper instead of the parallel one
    #[arg(long)]
    cpu: bool,

    /// Substrate for the parallel stepper
    #[arg(long, value_enum, default_value_t = SubstrateArg::Gpu)]
    substrate: SubstrateArg,

    /// Worker threads for the thread substrate. Defaults to one per core.
    #[arg(long)]
    threads: Option<usize>,

    /// Grid width in cells. Defaults to 256, or the terminal width when headless.
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Grid height in cells. Defaults to 256, or the terminal height minus the
    /// status row when headless.
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Probability that a random cell starts alive (0.0-1.0)
    #[arg(long, default_value_t = DEFAULT_LIVE_PROBABILITY)]
    density: f64,

    /// Random seed for reproducible grids. When omitted, a random seed is used.
    #[arg(long)]
    seed: Option<u64>,

    /// Start from a named pattern instead of a random grid
    #[arg(long, value_enum)]
    pattern: Option<Pattern>,

    /// Print generations to the terminal instead of opening a window
    #[arg(long)]
    headless: bool,

    /// Stop after this many generations. Headless output to a pipe stops at 100.
    #[arg(short = 'g', long)]
    generations: Option<u64>,

    /// Delay between headless generations in milliseconds
    #[arg(long, default_value_t = HEADLESS_FRAME_MILLIS)]
    delay_ms: u64,

    /// Continue sequentially if the parallel substrate fails mid-run
    #[arg(long)]
    fallback: bool,
}

impl Args {
    /// Resolve defaults. `terminal` is the (columns, rows) of an interactive
    /// terminal for headless runs: the grid fills it, leaving the last row for
    /// the status line, and runs until `Q` instead of a fixed generation count.
    fn into_config(self, terminal: Option<(u16, u16)>) -> SimConfig {
        let (default_width, default_height) = match (self.headless, terminal) {
            (false, _) => (GRID_WIDTH, GRID_HEIGHT),
            (true, Some((columns, rows))) => (
                u32::from(columns).max(1),
                u32::from(rows).saturating_sub(1).max(1),
            ),
            (true, None) => (HEADLESS_WIDTH, HEADLESS_HEIGHT),
        };

        let mode = if self.cpu {
            ExecutionMode::Sequential
        } else {
            match self.substrate {
                SubstrateArg::Gpu => ExecutionMode::Parallel(SubstrateKind::Gpu),
                SubstrateArg::Threads => ExecutionMode::Parallel(SubstrateKind::Threads {
                    threads: self.threads,
                }),
            }
        };

        let seeding = match self.pattern {
            Some(pattern) => Seeding::Pattern(pattern),
            None => {
                let seed = self.seed.unwrap_or_else(rand::random);
                log::info!("Seed: {}", seed);
                Seeding::Random {
                    probability: self.density,
                    seed,
                }
            }
        };

        let generations = match (self.generations, self.headless, terminal) {
            (Some(limit), _, _) => Some(limit),
            (None, true, None) => Some(HEADLESS_GENERATIONS),
            (None, _, _) => None,
        };

        SimConfig {
            width: self.width.unwrap_or(default_width),
            height: self.height.unwrap_or(default_height),
            mode,
            seeding,
            generations,
            fallback: self.fallback,
            headless: self.headless,
            frame_delay_ms: self.delay_ms,
        }
    }
}

/// Advance one generation, applying the fallback policy on substrate failure.
///
/// With `fallback` set, a failed parallel step switches the driver to the
/// sequential stepper and retries; the failed step left the grid untouched.
fn advance(driver: &mut SimulationDriver, fallback: bool) -> Result<u64> {
    match driver.advance() {
        Err(LifeError::ComputeSubstrate(reason)) if fallback => {
            log::warn!("Parallel step failed ({}), falling back to sequential", reason);
            driver.set_stepper(Box::new(SequentialStepper::new()))?;
            driver.advance()
        }
        result => result,
    }
}

/// Build and start the driver described by the configuration
fn start_driver(config: &SimConfig) -> Result<SimulationDriver> {
    let mut driver = SimulationDriver::new(
        config.width,
        config.height,
        config.initial_pattern(),
        config.mode,
    )?;
    driver.start()?;
    Ok(driver)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let terminal = if args.headless {
        headless::terminal_size()
    } else {
        None
    };
    let config = args.into_config(terminal);
    log::info!(
        "Life Grid {}x{} {}",
        config.width,
        config.height,
        config.mode_label()
    );

    let result = if config.headless {
        headless::run(&config)
    } else {
        app::run(config)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with_terminal(args: &[&str], terminal: Option<(u16, u16)>) -> SimConfig {
        Args::try_parse_from(std::iter::once("life-grid").chain(args.iter().copied()))
            .unwrap()
            .into_config(terminal)
    }

    fn parse(args: &[&str]) -> SimConfig {
        parse_with_terminal(args, None)
    }

    #[test]
    fn test_parallel_gpu_by_default() {
        let config = parse(&["--seed", "1"]);
        assert_eq!(config.mode, ExecutionMode::Parallel(SubstrateKind::Gpu));
        assert_eq!((config.width, config.height), (GRID_WIDTH, GRID_HEIGHT));
        assert_eq!(config.generations, None);
    }

    #[test]
    fn test_cpu_flag_selects_sequential() {
        let config = parse(&["--cpu", "--substrate", "threads"]);
        assert_eq!(config.mode, ExecutionMode::Sequential);
    }

    #[test]
    fn test_headless_defaults() {
        let config = parse(&["--headless", "--seed", "9", "--density", "0.25"]);
        assert_eq!((config.width, config.height), (HEADLESS_WIDTH, HEADLESS_HEIGHT));
        assert_eq!(config.generations, Some(HEADLESS_GENERATIONS));
        assert_eq!(
            config.seeding,
            Seeding::Random {
                probability: 0.25,
                seed: 9
            }
        );
    }

    #[test]
    fn test_headless_fills_terminal() {
        let config = parse_with_terminal(&["--headless", "--seed", "2"], Some((100, 40)));
        assert_eq!((config.width, config.height), (100, 39));
        assert_eq!(config.generations, None);

        let config = parse_with_terminal(&["--headless", "-W", "30", "-g", "5"], Some((100, 40)));
        assert_eq!((config.width, config.height), (30, 39));
        assert_eq!(config.generations, Some(5));

        // A one-row terminal still yields a usable grid
        let config = parse_with_terminal(&["--headless"], Some((10, 1)));
        assert_eq!((config.width, config.height), (10, 1));
    }

    #[test]
    fn test_windowed_ignores_terminal() {
        let config = parse_with_terminal(&["--seed", "3"], Some((100, 40)));
        assert_eq!((config.width, config.height), (GRID_WIDTH, GRID_HEIGHT));
        assert_eq!(config.generations, None);
    }

    #[test]
    fn test_threads_and_pattern() {
        let config = parse(&["--substrate", "threads", "--threads", "3", "--pattern", "glider-gun"]);
        assert_eq!(
            config.mode,
            ExecutionMode::Parallel(SubstrateKind::Threads { threads: Some(3) })
        );
        assert_eq!(config.seeding, Seeding::Pattern(Pattern::GliderGun));
    }

    #[test]
    fn test_zero_width_fails_to_start() {
        let config = parse(&["--cpu", "--width", "0", "--seed", "1"]);
        assert!(matches!(
            start_driver(&config),
            Err(LifeError::InvalidDimension { width: 0, .. })
        ));
    }

    #[test]
    fn test_advance_falls_back() {
        use life_grid::simulation::{Grid, InitialPattern, Stepper};

        struct Broken;
        impl Stepper for Broken {
            fn step(&mut self, _: &Grid, _: &mut Grid) -> Result<()> {
                Err(LifeError::ComputeSubstrate("lost".into()))
            }
            fn name(&self) -> &'static str {
                "broken"
            }
        }

        let initial = InitialPattern::Random {
            probability: 0.5,
            seed: 4,
        };
        let mut driver = SimulationDriver::with_stepper(8, 8, initial, Box::new(Broken)).unwrap();
        assert!(advance(&mut driver, false).is_err());
        assert_eq!(advance(&mut driver, true).unwrap(), 1);
        assert_eq!(driver.stepper_name(), Some("sequential"));
    }
}
