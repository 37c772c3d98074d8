//! Console seam between the activation flow and the operator's terminal.

pub mod style;
pub mod term;

#[cfg(test)]
pub mod scripted;

use std::io;

pub use term::TerminalConsole;

/// Kind of status line written to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Plain,
    Info,
    Success,
    Warning,
    Error,
}

/// Line-based operator interaction.
pub trait Console {
    /// Show `prompt` and read one line of input (without the line terminator).
    ///
    /// Closed input is reported as [`io::ErrorKind::UnexpectedEof`].
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Drop keystrokes typed ahead of the next prompt.
    fn discard_pending_input(&mut self) -> io::Result<()>;

    /// Show `prompt` and block until a key is pressed.
    fn wait_for_key(&mut self, prompt: &str) -> io::Result<()>;

    /// Write a status line.
    fn status(&mut self, status: Status, message: &str);

    fn plain(&mut self, message: &str) {
        self.status(Status::Plain, message);
    }

    fn info(&mut self, message: &str) {
        self.status(Status::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.status(Status::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.status(Status::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.status(Status::Error, message);
    }
}
