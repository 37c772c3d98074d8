//! Terminal-backed [`Console`] using `console` for I/O and `crossterm` to
//! drain typed-ahead input.

use std::io::{self, BufRead, IsTerminal};
use std::time::Duration;

use console::Term;
use crossterm::{event, terminal};
use tracing::debug;

use super::{style, Console, Status};

/// Console on the process's own terminal.
///
/// When stdin is not a terminal (piped answers), input is read line by line
/// without echo handling and key acknowledgments are skipped.
pub struct TerminalConsole {
    term: Term,
    interactive: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        let term = Term::stdout();
        let interactive = io::stdin().is_terminal() && term.is_term();
        Self { term, interactive }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.term
            .write_str(&format!("{} ", style::accent(format!("{}:", prompt))))?;
        self.term.flush()?;

        if self.interactive {
            return self.term.read_line();
        }

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }
        self.term.write_line("")?;

        Ok(line.trim_end_matches(|c| c == '\r' || c == '\n').to_string())
    }

    fn discard_pending_input(&mut self) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }

        // Raw mode exposes bytes still sitting in the line buffer as events
        terminal::enable_raw_mode()?;
        let drained = drain_events();
        terminal::disable_raw_mode()?;
        drained
    }

    fn wait_for_key(&mut self, prompt: &str) -> io::Result<()> {
        if !self.interactive {
            return Ok(());
        }

        self.discard_pending_input()?;
        self.term.write_line(&style::dim(prompt))?;
        self.term.read_key()?;
        Ok(())
    }

    fn status(&mut self, status: Status, message: &str) {
        let line = match status {
            Status::Plain => message.to_string(),
            Status::Info => format!("{} {}", style::accent("→"), message),
            Status::Success => format!("{} {}", style::success("✓"), message),
            Status::Warning => format!("{} {}", style::warning("!"), message),
            Status::Error => format!("{} {}", style::error("✗"), style::error(message)),
        };

        if let Err(e) = self.term.write_line(&line) {
            debug!("Failed to write to console: {}", e);
        }
    }
}

fn drain_events() -> io::Result<()> {
    let mut dropped = 0usize;
    while event::poll(Duration::ZERO)? {
        event::read()?;
        dropped += 1;
    }
    if dropped > 0 {
        debug!("Discarded {} pending input events", dropped);
    }
    Ok(())
}
