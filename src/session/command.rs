//! Command interpreter.
//!
//! Turns one line of user input into an [`Intent`]. Only two slash commands
//! exist; any other text is an implicit draft request.

/// Prefix of an explicit draft request.
const DRAFT_PREFIX: &str = "/draft";

/// The status query command.
const VARS_COMMAND: &str = "/vars";

/// Hint shown for `/draft` without a description.
pub const DRAFT_USAGE: &str = "Please specify what document you want to draft. Example: `/draft notice to insurer for motor accident in India`";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `/vars`: report filled and missing variables
    StatusQuery,
    /// `/draft` with nothing after it
    InvalidDraftCommand,
    /// Find a template for this text and start a draft
    DraftRequest {
        /// Effective query text
        query: String,
        /// Whether the request came through `/draft`
        explicit: bool,
    },
}

/// Classify raw input.
///
/// Matching of both commands is case-insensitive.
pub fn interpret(raw: &str) -> Intent {
    if raw.eq_ignore_ascii_case(VARS_COMMAND) {
        return Intent::StatusQuery;
    }

    let has_draft_prefix =
        raw.get(..DRAFT_PREFIX.len()).is_some_and(|head| head.eq_ignore_ascii_case(DRAFT_PREFIX));
    if has_draft_prefix {
        let query = raw[DRAFT_PREFIX.len()..].trim();
        if query.is_empty() {
            return Intent::InvalidDraftCommand;
        }
        return Intent::DraftRequest { query: query.to_string(), explicit: true };
    }

    Intent::DraftRequest { query: raw.to_string(), explicit: false }
}
