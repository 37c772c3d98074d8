//! In-memory console that replays canned answers and records output.

use std::collections::VecDeque;
use std::io;

use super::{Console, Status};

#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub lines: Vec<(Status, String)>,
    pub discards: usize,
    pub keys_waited: usize,
    /// Make `discard_pending_input` fail, as it does without raw-mode support.
    pub fail_discard: bool,
}

impl ScriptedConsole {
    pub fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether any line of `status` contains `needle`.
    pub fn printed(&self, status: Status, needle: &str) -> bool {
        self.lines
            .iter()
            .any(|(s, line)| *s == status && line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn discard_pending_input(&mut self) -> io::Result<()> {
        self.discards += 1;
        if self.fail_discard {
            return Err(io::Error::new(io::ErrorKind::Other, "raw mode unavailable"));
        }
        Ok(())
    }

    fn wait_for_key(&mut self, _prompt: &str) -> io::Result<()> {
        self.keys_waited += 1;
        Ok(())
    }

    fn status(&mut self, status: Status, message: &str) {
        self.lines.push((status, message.to_string()));
    }
}
