//! Operator prompts for role, duration and justification.
//!
//! Each prompt loops until its parse function accepts the input. Answers
//! supplied on the command line go through the same parse functions.

use std::io;

use tracing::debug;

use crate::error::InputError;
use crate::pim::catalog::parse_selection;
use crate::pim::{ActivationDuration, EligibleRole, RoleCatalog};
use crate::terminal::{style, Console};

/// Answers supplied up front; `None` means ask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answers {
    pub role: Option<String>,
    pub duration: Option<String>,
    pub justification: Option<String>,
}

/// Validate a justification: anything but blank.
pub fn parse_justification(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(trimmed.to_string())
}

pub struct Prompter<'c, C: Console> {
    console: &'c mut C,
}

impl<'c, C: Console> Prompter<'c, C> {
    pub fn new(console: &'c mut C) -> Self {
        Self { console }
    }

    /// Show the catalog and ask which role to activate.
    pub fn select_role<'r>(
        &mut self,
        catalog: &'r RoleCatalog,
        prefilled: Option<&str>,
    ) -> io::Result<&'r EligibleRole> {
        if let Some(role) = self.prefilled("role", prefilled, |answer| catalog.resolve(answer)) {
            return Ok(role);
        }

        self.console.plain("");
        self.console.plain(&style::header("Eligible roles:"));
        for (index, role) in catalog.entries() {
            self.console.plain(&format!(
                "  {} {}",
                style::accent(format!("{:>2}.", index)),
                role.display_text()
            ));
        }
        self.console.plain("");

        let label = format!("Select a role [1-{}]", catalog.len());
        let index = self.ask(&label, |input| parse_selection(input, catalog.len()))?;

        // parse_selection bounds the index to the catalog
        catalog
            .get(index)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "selection out of range"))
    }

    pub fn duration(&mut self, prefilled: Option<&str>) -> io::Result<ActivationDuration> {
        if let Some(duration) = self.prefilled("duration", prefilled, ActivationDuration::parse) {
            return Ok(duration);
        }
        self.ask("Duration (e.g. 1H, 30M, 2H30M)", ActivationDuration::parse)
    }

    pub fn justification(&mut self, prefilled: Option<&str>) -> io::Result<String> {
        if let Some(text) = self.prefilled("justification", prefilled, parse_justification) {
            return Ok(text);
        }
        self.ask("Justification", parse_justification)
    }

    /// Prompt until `parse` accepts the answer.
    fn ask<T>(
        &mut self,
        label: &str,
        mut parse: impl FnMut(&str) -> Result<T, InputError>,
    ) -> io::Result<T> {
        loop {
            if let Err(e) = self.console.discard_pending_input() {
                debug!("Could not discard pending input: {}", e);
            }
            let line = self.console.read_line(label)?;
            match parse(&line) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Rejected input for {:?}: {}", label, e);
                    self.console.warn(&e.to_string());
                }
            }
        }
    }

    /// Use a command-line answer if it parses; otherwise report it and fall back to prompting.
    fn prefilled<T>(
        &mut self,
        what: &str,
        answer: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, InputError>,
    ) -> Option<T> {
        let answer = answer?;
        match parse(answer) {
            Ok(value) => Some(value),
            Err(e) => {
                self.console
                    .warn(&format!("Ignoring --{} '{}': {}", what, answer, e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::scripted::ScriptedConsole;
    use crate::terminal::Status;

    fn catalog() -> RoleCatalog {
        let role = |id: &str, name: &str| EligibleRole {
            principal_id: "user-1".into(),
            role_definition_id: id.into(),
            display_name: name.into(),
            directory_scope_id: "/".into(),
        };
        RoleCatalog::new(vec![role("r1", "Global Reader"), role("r2", "Security Reader")])
    }

    #[test]
    fn test_parse_justification() {
        assert_eq!(parse_justification("  incident response "), Ok("incident response".into()));
        assert_eq!(parse_justification(""), Err(InputError::Empty));
        assert_eq!(parse_justification(" \t "), Err(InputError::Empty));
    }

    #[test]
    fn test_select_role_reprompts_until_valid() {
        let catalog = catalog();
        let mut console = ScriptedConsole::new(["", "abc", "0", "3", "2"]);

        let role = Prompter::new(&mut console).select_role(&catalog, None).unwrap();

        assert_eq!(role.display_name, "Security Reader");
        assert_eq!(console.prompts.len(), 5);
        assert_eq!(console.discards, 5);
        assert!(console.printed(Status::Plain, "Global Reader"));
        assert!(console.printed(Status::Warning, "not a number"));
        assert!(console.printed(Status::Warning, "between 1 and 2"));
    }

    #[test]
    fn test_duration_reprompts_until_valid() {
        let mut console = ScriptedConsole::new(["", "1.5H", "0M", "45m"]);

        let duration = Prompter::new(&mut console).duration(None).unwrap();

        assert_eq!(duration.to_iso8601(), "PT45M");
        assert_eq!(console.prompts.len(), 4);
        assert!(console.printed(Status::Warning, "greater than zero"));
    }

    #[test]
    fn test_justification_rejects_blank() {
        let mut console = ScriptedConsole::new(["   ", "incident response"]);

        let text = Prompter::new(&mut console).justification(None).unwrap();

        assert_eq!(text, "incident response");
        assert!(console.printed(Status::Warning, "A value is required"));
    }

    #[test]
    fn test_valid_prefilled_skips_prompt() {
        let catalog = catalog();
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        let mut prompter = Prompter::new(&mut console);

        let role = prompter.select_role(&catalog, Some("global reader")).unwrap();
        let duration = prompter.duration(Some("2h")).unwrap();
        let text = prompter.justification(Some("change CHG-42")).unwrap();

        assert_eq!(role.role_definition_id, "r1");
        assert_eq!(duration.to_iso8601(), "PT2H");
        assert_eq!(text, "change CHG-42");
        assert!(console.prompts.is_empty());
    }

    #[test]
    fn test_invalid_prefilled_falls_back_to_prompt() {
        let mut console = ScriptedConsole::new(["30M"]);

        let duration = Prompter::new(&mut console).duration(Some("forever")).unwrap();

        assert_eq!(duration.to_iso8601(), "PT30M");
        assert_eq!(console.prompts.len(), 1);
        assert!(console.printed(Status::Warning, "Ignoring --duration 'forever'"));
    }

    #[test]
    fn test_discard_failure_does_not_stop_prompting() {
        let mut console = ScriptedConsole::new(["bad", "1H"]);
        console.fail_discard = true;

        let duration = Prompter::new(&mut console).duration(None).unwrap();

        assert_eq!(duration.to_iso8601(), "PT1H");
        assert_eq!(console.discards, 2);
        assert_eq!(console.prompts.len(), 2);
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut console = ScriptedConsole::new(["nope"]);

        let err = Prompter::new(&mut console).duration(None).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
