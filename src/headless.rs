use std::io::{self, Stdout, Write};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::tty::IsTty;
use crossterm::{execute, queue};

use life_grid::config::SimConfig;
use life_grid::simulation::{Grid, SimulationDriver};
use life_grid::{LifeError, Result};

const CONTINUE_HINT: &str = "Hit Any Key to Continue";
const QUIT_HINT: &str = "Q to Quit";

/// Columns and rows of the terminal, if stdout is one
pub fn terminal_size() -> Option<(u16, u16)> {
    if !io::stdout().is_tty() {
        return None;
    }
    terminal::size().ok()
}

/// Raw mode on the alternate screen; the previous screen is restored on drop
struct TerminalSession {
    out: Stdout,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        if let Err(e) = execute!(out, EnterAlternateScreen, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self { out })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Run in the terminal: draw each generation with a status line.
///
/// On an interactive terminal the first generation waits for a key and
/// `Q` quits at any later point. Piped output just prints frames.
pub fn run(config: &SimConfig) -> Result<()> {
    let mut driver = crate::start_driver(config)?;
    let session = if io::stdout().is_tty() {
        Some(TerminalSession::enter().map_err(terminal_error)?)
    } else {
        None
    };

    let result = run_loop(&mut driver, config, session.is_some());
    drop(session);
    driver.stop();
    result?;

    println!("Done after {} generations", driver.generation());
    Ok(())
}

fn run_loop(driver: &mut SimulationDriver, config: &SimConfig, interactive: bool) -> Result<()> {
    let limit = config.generations.unwrap_or(u64::MAX);
    let delay = Duration::from_millis(config.frame_delay_ms);
    let hint = |text| interactive.then_some(text);

    draw(driver, config.mode_label(), hint(CONTINUE_HINT), interactive)?;
    if interactive && is_interrupt(&wait_for_key().map_err(terminal_error)?) {
        return Ok(());
    }

    while driver.generation() < limit {
        let start = Instant::now();
        crate::advance(driver, config.fallback)?;
        let info = format!(
            "{}  Time: {:.6}",
            config.mode_label(),
            start.elapsed().as_secs_f64()
        );
        draw(driver, &info, hint(QUIT_HINT), interactive)?;

        if interactive {
            if quit_requested(delay).map_err(terminal_error)? {
                log::info!("Quit requested at generation {}", driver.generation());
                break;
            }
        } else if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    Ok(())
}

fn draw(
    driver: &SimulationDriver,
    info: &str,
    hint: Option<&str>,
    interactive: bool,
) -> Result<()> {
    let Some(grid) = driver.current() else {
        return Ok(());
    };

    let status = status_line(grid, driver.generation(), info, hint);
    write_frame(&mut io::stdout().lock(), grid, &status, interactive).map_err(terminal_error)
}

/// Write one frame. Interactive frames repaint the screen from the top-left
/// and show the status line in reverse video below the grid.
fn write_frame(
    out: &mut impl Write,
    grid: &Grid,
    status: &str,
    interactive: bool,
) -> io::Result<()> {
    if interactive {
        queue!(out, Clear(ClearType::All))?;
        for (y, row) in grid.to_string().lines().enumerate() {
            let y = u16::try_from(y).unwrap_or(u16::MAX);
            queue!(out, MoveTo(0, y), Print(row))?;
        }
        let status_row = u16::try_from(grid.height()).unwrap_or(u16::MAX);
        queue!(
            out,
            MoveTo(0, status_row),
            SetAttribute(Attribute::Reverse),
            Print(status),
            SetAttribute(Attribute::Reset)
        )?;
    } else {
        writeln!(out, "{}", grid)?;
        writeln!(out, "{}", status)?;
    }
    out.flush()
}

/// `(H x W)  Gen:     n  Lives:     n  info  [hint] `
fn status_line(grid: &Grid, generation: u64, info: &str, hint: Option<&str>) -> String {
    let mut line = format!(
        "({} x {})  Gen:{:6}  Lives:{:6}  {}",
        grid.height(),
        grid.width(),
        generation,
        grid.live_count(),
        info
    );
    if let Some(hint) = hint {
        line.push_str(&format!("  [{}] ", hint));
    }
    line
}

fn wait_for_key() -> io::Result<KeyEvent> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key);
            }
        }
    }
}

/// Wait up to `timeout` for input; true once a quit key is pressed
fn quit_requested(timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !event::poll(remaining)? {
            return Ok(false);
        }
        if let Event::Key(key) = event::read()? {
            if is_quit_key(&key) {
                return Ok(true);
            }
        }
    }
}

/// `q`, `Q` or Ctrl-C
fn is_quit_key(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && (matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) || is_interrupt(key))
}

/// Raw mode swallows SIGINT, so Ctrl-C arrives as a key
fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn terminal_error(e: io::Error) -> LifeError {
    LifeError::Display(format!("terminal error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use life_grid::simulation::Pattern;

    #[test]
    fn test_plain_frame_layout() {
        let grid = Pattern::Blinker.centered(5, 3).unwrap();
        let mut out = Vec::new();
        write_frame(&mut out, &grid, "status", false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "     \n OOO \n     \nstatus\n");
    }

    #[test]
    fn test_interactive_frame_repaints() {
        let grid = Pattern::Blinker.centered(5, 3).unwrap();
        let mut out = Vec::new();
        write_frame(&mut out, &grid, "status", true).unwrap();
        let frame = String::from_utf8(out).unwrap();
        assert!(frame.starts_with("\x1b[2J"), "{:?}", frame);
        assert!(frame.contains(" OOO "));
        assert!(frame.contains("status"));
        // Raw mode: rows are positioned with the cursor, not separated by newlines
        assert!(!frame.contains('\n'));
    }

    #[test]
    fn test_status_line_format() {
        let grid = Pattern::Glider.centered(20, 10).unwrap();
        assert_eq!(
            status_line(&grid, 12, "<CPU Mode>", None),
            "(10 x 20)  Gen:    12  Lives:     5  <CPU Mode>"
        );
        assert_eq!(
            status_line(&grid, 0, "<GPU Mode>", Some(CONTINUE_HINT)),
            "(10 x 20)  Gen:     0  Lives:     5  <GPU Mode>  [Hit Any Key to Continue] "
        );
    }

    #[test]
    fn test_quit_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit_key(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&press(KeyCode::Char('Q'), KeyModifiers::SHIFT)));
        assert!(is_quit_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&press(KeyCode::Char(' '), KeyModifiers::NONE)));

        let release = KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert!(!is_quit_key(&release));
    }
}
