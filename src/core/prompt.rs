//! Operator interaction.
//!
//! Workflows talk to the operator only through [`Prompter`]. The terminal
//! implementation writes to stderr so stdout stays reserved for the JSON
//! result.

use dialoguer::Password;
use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{Error, Result};

pub trait Prompter {
    /// Free text answer; an empty answer yields `default` when one is given.
    fn ask(&self, question: &str, default: Option<&str>) -> Result<String>;

    /// Like `ask`, but neither the typed answer nor a stored default is echoed.
    fn secret(&self, question: &str, default: Option<&str>) -> Result<String>;

    /// Yes/no question.
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;

    /// Show text verbatim (checklists, previews, diffs).
    fn show(&self, text: &str);
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Create with automatic TTY detection.
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }

    pub fn with_interactive(interactive: bool) -> Self {
        Self { interactive }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(|e| {
            Error::internal_io(e.to_string(), Some("read operator input".to_string()))
        })?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &str, default: Option<&str>) -> Result<String> {
        if !self.interactive {
            return default.map(str::to_string).ok_or_else(|| {
                Error::validation_missing_argument(vec![question.to_string()])
                    .with_hint("Run the command from an interactive terminal")
            });
        }

        match default {
            Some(value) if !value.is_empty() => eprint!("{} [{}]: ", question, value),
            _ => eprint!("{}: ", question),
        }
        io::stderr().flush().ok();

        let answer = self.read_line()?;
        if answer.trim().is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    fn secret(&self, question: &str, default: Option<&str>) -> Result<String> {
        if !self.interactive {
            return self.ask(question, default);
        }

        let prompt = match default {
            Some(value) if !value.is_empty() => format!("{} [keep stored value]", question),
            _ => question.to_string(),
        };

        let answer = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| {
                Error::internal_io(e.to_string(), Some("read operator input".to_string()))
            })?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        if !self.interactive {
            return Ok(default);
        }

        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} {}: ", question, suffix);
        io::stderr().flush().ok();

        let answer = self.read_line()?.trim().to_lowercase();
        if answer.is_empty() {
            return Ok(default);
        }
        Ok(answer.starts_with('y') || answer.starts_with('j'))
    }

    fn show(&self, text: &str) {
        eprintln!("{}", text);
    }
}
