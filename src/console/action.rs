//! Console actions.
//!
//! Lines starting with `:` stand in for the buttons of a graphical front
//! end. Everything else goes to the session as chat input.

use crate::session::ExportFormat;

/// Prefix marking a console action.
pub const ACTION_PREFIX: char = ':';

/// Help text for the console actions.
pub const HELP: &str = "\
Type what you need in plain words, or `/draft <description>`. `/vars` shows your progress.

Actions:
  :use            accept the proposed template
  :alt <n>        switch to alternative n
  :answer         answer the questions (strict replacement)
  :answer --loose answer the questions, allow rewording
  :edit           change the answers of a generated draft
  :regen          generate the draft again
  :export md|docx save the draft
  :import <n>     create a template from web result n
  :show           print the current draft
  :status         print the session state
  :help           print this help
  :quit           leave";

/// A console action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Accept the proposed template
    Use,
    /// Switch to the alternative at this 1-based position
    Alternative(usize),
    /// Fill in the question form
    Answer {
        /// Allow the engine to reword answers
        loose: bool,
    },
    /// Reopen the question form
    Edit,
    /// Render the draft again
    Regenerate,
    /// Save the draft
    Export(ExportFormat),
    /// Bootstrap the web result at this 1-based position
    Import(usize),
    /// Print the draft
    Show,
    /// Print the session state
    Status,
    /// Print the help text
    Help,
    /// Leave the console
    Quit,
}

impl Action {
    /// Parse an action line, with or without its leading `:`.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let line = line.strip_prefix(ACTION_PREFIX).unwrap_or(line);
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();

        let action = match name.as_str() {
            "use" | "confirm" => Self::Use,
            "alt" => Self::Alternative(position(arg, "alt")?),
            "answer" => match arg {
                None => Self::Answer { loose: false },
                Some("--loose") => Self::Answer { loose: true },
                Some(other) => return Err(format!("Unknown option for :answer: {other}")),
            },
            "edit" => Self::Edit,
            "regen" | "regenerate" => Self::Regenerate,
            "export" => Self::Export(arg.unwrap_or("md").parse()?),
            "import" => Self::Import(position(arg, "import")?),
            "show" => Self::Show,
            "status" => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            "" => return Err("Empty action. Type :help for the list.".to_string()),
            other => return Err(format!("Unknown action :{other}. Type :help for the list.")),
        };
        Ok(action)
    }
}

fn position(arg: Option<&str>, action: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("Usage: :{action} <n>"))?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Expected a positive number for :{action}, got {arg}")),
    }
}
