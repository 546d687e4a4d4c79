use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use life_grid::config::{SimConfig, WINDOW_SIZE, WINDOW_TITLE};
use life_grid::gpu::{DisplayBuffers, RenderPipeline, SurfaceContext};
use life_grid::simulation::{Grid, SimulationDriver};
use life_grid::{LifeError, Result};

/// Open a window and run the simulation until it is closed or the
/// generation limit is reached
pub fn run(config: SimConfig) -> Result<()> {
    // Bring up the compute substrate before any window exists so that
    // initialization failures exit cleanly
    let driver = crate::start_driver(&config)?;

    let event_loop =
        EventLoop::new().map_err(|e| LifeError::Display(format!("event loop: {e}")))?;
    let mut app = App::new(driver, config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| LifeError::Display(format!("event loop: {e}")))?;

    app.finish()
}

/// GPU resources for presenting the grid
struct Display {
    window: Arc<Window>,
    context: SurfaceContext,
    buffers: DisplayBuffers,
    pipeline: RenderPipeline,
    bind_group: wgpu::BindGroup,
}

/// Application state
pub struct App {
    config: SimConfig,
    driver: SimulationDriver,
    display: Option<Display>,
    paused: bool,
    single_step: bool,
    last_step: Duration,
    fps_counter: FpsCounter,
    /// Error that ended the event loop, reported as the exit status
    fatal: Option<LifeError>,
}

impl App {
    fn new(driver: SimulationDriver, config: SimConfig) -> Self {
        Self {
            config,
            driver,
            display: None,
            paused: false,
            single_step: false,
            last_step: Duration::ZERO,
            fps_counter: FpsCounter::new(),
            fatal: None,
        }
    }

    fn finish(mut self) -> Result<()> {
        self.driver.stop();
        match self.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: LifeError) {
        log::error!("{}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }

    fn create_display(&self, event_loop: &ActiveEventLoop) -> Result<Display> {
        let window_attrs = Window::default_attributes()
            .with_title(format!("{} - Initializing...", WINDOW_TITLE))
            .with_inner_size(winit::dpi::LogicalSize::new(WINDOW_SIZE, WINDOW_SIZE));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| LifeError::Display(format!("failed to create window: {e}")))?,
        );

        log::info!("Creating display context...");
        let context = pollster::block_on(SurfaceContext::new(window.clone()))?;
        let (width, height) = self.driver.dimensions();
        let buffers = DisplayBuffers::new(&context.device, &context.queue, width, height)?;
        let pipeline = RenderPipeline::new(&context.device, context.format());
        let bind_group = pipeline.create_bind_group(&context.device, &buffers);

        Ok(Display {
            window,
            context,
            buffers,
            pipeline,
            bind_group,
        })
    }

    /// Advance the simulation if it is running, then draw the current generation
    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let limit_reached = self
            .config
            .generations
            .is_some_and(|limit| self.driver.generation() >= limit);
        if limit_reached {
            log::info!("Reached {} generations, exiting...", self.driver.generation());
            event_loop.exit();
            return;
        }

        if !self.paused || self.single_step {
            self.single_step = false;
            let start = Instant::now();
            if let Err(e) = crate::advance(&mut self.driver, self.config.fallback) {
                self.fail(event_loop, e);
                return;
            }
            self.last_step = start.elapsed();
        }

        self.draw();
    }

    fn draw(&mut self) {
        let (Some(display), Some(grid)) = (&self.display, self.driver.current()) else {
            return;
        };
        let context = &display.context;

        let output = match context.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                context.surface.configure(&context.device, &context.config);
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        display.buffers.update_cells(&context.queue, grid);

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        display.pipeline.draw(&mut encoder, &view, &display.bind_group);
        context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if let Some(fps) = self.fps_counter.tick() {
            display.window.set_title(&title(
                &self.config,
                self.driver.generation(),
                grid,
                self.last_step,
                fps,
                self.paused,
            ));
        }
    }

    fn handle_key(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Space => {
                self.paused = !self.paused;
                log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
            }

            KeyCode::KeyN => {
                if self.paused {
                    self.single_step = true;
                }
            }

            KeyCode::KeyR => {
                let (width, height) = self.driver.dimensions();
                let seed = rand::random();
                match Grid::random(width, height, self.config.live_probability(), seed)
                    .and_then(|grid| self.driver.reseed(grid))
                {
                    Ok(()) => log::info!("Reseeded with seed {}", seed),
                    Err(e) => log::warn!("Reseed failed: {}", e),
                }
            }

            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.display.is_some() {
            return;
        }

        match self.create_display(event_loop) {
            Ok(display) => {
                log::info!("Controls:");
                log::info!("  Space: Pause/resume");
                log::info!("  N: Single step while paused");
                log::info!("  R: Reseed randomly");
                log::info!("  Q/Escape: Quit");
                display.window.request_redraw();
                self.display = Some(display);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting...");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key_code) = event.physical_key {
                        if matches!(key_code, KeyCode::Escape | KeyCode::KeyQ) {
                            log::info!("Quit requested, exiting...");
                            event_loop.exit();
                        } else {
                            self.handle_key(key_code);
                        }
                    }
                }
            }
            WindowEvent::Resized(new_size) => {
                if let Some(display) = &mut self.display {
                    display.context.resize(new_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(display) = &self.display {
                    display.window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn title(
    config: &SimConfig,
    generation: u64,
    grid: &Grid,
    step: Duration,
    fps: f64,
    paused: bool,
) -> String {
    format!(
        "{} {} - Gen {} - Lives {} - Step {:.3} ms - {:.0} FPS{}",
        WINDOW_TITLE,
        config.mode_label(),
        generation,
        grid.live_count(),
        step.as_secs_f64() * 1000.0,
        fps,
        if paused { " [Paused]" } else { "" }
    )
}

/// Simple FPS counter
struct FpsCounter {
    last_update: Instant,
    frame_count: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    /// Tick the counter, returns Some(fps) every second
    fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed.as_secs_f64() >= 1.0 {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.frame_count = 0;
            self.last_update = Instant::now();
            Some(fps)
        } else {
            None
        }
    }
}
