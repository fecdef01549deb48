#![forbid(unsafe_code)]

//! Terminal ownership for the interactive shell.
//!
//! Entering: raw mode, alternate screen, hidden cursor. Leaving happens in
//! reverse on drop, and a panic hook restores the terminal before the
//! default hook prints.

use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;

use crossterm::event::Event;

/// RAII guard over the terminal modes the shell needs.
#[derive(Debug)]
pub struct TerminalSession {
    alternate_screen: bool,
    cursor_hidden: bool,
}

impl TerminalSession {
    /// Enter raw mode, switch to the alternate screen, and hide the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode cannot be enabled.
    pub fn enter() -> io::Result<Self> {
        install_panic_hook();
        crossterm::terminal::enable_raw_mode()?;
        tracing::info!("terminal raw mode enabled");

        let mut session = Self {
            alternate_screen: false,
            cursor_hidden: false,
        };
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        session.alternate_screen = true;
        crossterm::execute!(stdout, crossterm::cursor::Hide)?;
        session.cursor_hidden = true;
        Ok(session)
    }

    /// Current terminal size (columns, rows).
    pub fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> io::Result<Option<Event>> {
        if crossterm::event::poll(timeout)? {
            crossterm::event::read().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Replace the screen contents with `lines`.
    pub fn draw(&self, lines: &[String]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        crossterm::queue!(
            stdout,
            crossterm::cursor::MoveTo(0, 0),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All)
        )?;
        for (row, line) in lines.iter().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            crossterm::queue!(
                stdout,
                crossterm::cursor::MoveTo(0, row),
                crossterm::style::Print(line)
            )?;
        }
        stdout.flush()
    }

    fn cleanup(&mut self) {
        let mut stdout = io::stdout();
        if self.cursor_hidden {
            let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
            self.cursor_hidden = false;
        }
        if self.alternate_screen {
            let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
            self.alternate_screen = false;
        }
        let _ = crossterm::terminal::disable_raw_mode();
        tracing::info!("terminal restored");
        let _ = stdout.flush();
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            best_effort_cleanup();
            previous(info);
        }));
    });
}

fn best_effort_cleanup() {
    let mut stdout = io::stdout();
    let _ = crossterm::execute!(stdout, crossterm::cursor::Show);
    let _ = crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen);
    let _ = crossterm::terminal::disable_raw_mode();
    let _ = stdout.flush();
}
