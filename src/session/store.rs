//! Session store: the single source of truth for one drafting session.
//!
//! Holds the transcript, the active draft, pending web results and the
//! in-flight flags. Visibility (whether the question form shows) and the
//! session phase are derived from this state, never stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{Alternative, DraftResponse, Question, VariableMap, WebResult};

/// Confidence shown when the engine reports none.
pub const DEFAULT_DISPLAY_CONFIDENCE: f64 = 0.85;

/// Justification shown when the engine reports none.
pub const DEFAULT_JUSTIFICATION: &str = "Best match based on your query";

/// Reply to `/vars` when there is nothing to report.
pub const NO_ACTIVE_DRAFT: &str = "No active draft. Please start by requesting a document.";

static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)% confidence").expect("confidence pattern is valid"));

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person drafting
    User,
    /// The session
    Assistant,
}

/// One transcript entry. Never changed after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Markdown text
    pub content: String,
    /// When the message was appended
    pub at: DateTime<Utc>,
}

/// Append-only conversation log.
///
/// Order is completion order of the operations that produced the messages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Append a message.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message { role, content: content.into(), at: Utc::now() });
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended after the first `start`.
    pub fn since(&self, start: usize) -> &[Message] {
        self.messages.get(start..).unwrap_or(&[])
    }

    /// The most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The session's active document-in-progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftState {
    /// Engine handle for this draft
    pub instance_id: String,
    /// Template the draft fills
    pub template_id: String,
    /// Template title
    pub template_title: String,
    /// Match quality in [0, 1], if known
    pub confidence: Option<f64>,
    /// Why the engine picked this template, if given
    pub justification: Option<String>,
    /// Other candidate templates, in engine order
    pub alternatives: Vec<Alternative>,
    /// One question per unresolved variable
    pub questions: Vec<Question>,
    /// Known values; keys absent or `null` are unanswered
    pub pre_filled: VariableMap,
    /// Rendered draft, present only after finalization
    pub draft_markdown: Option<String>,
    /// Draft counter, bumped on each regeneration
    pub draft_number: u32,
}

impl DraftState {
    /// Build the draft state for a freshly resolved template.
    ///
    /// A structured confidence wins; otherwise a "NN% confidence" phrase in
    /// the engine message is used for display.
    pub fn from_response(response: DraftResponse) -> Self {
        let confidence = response.confidence.or_else(|| parse_confidence(&response.message));
        Self {
            instance_id: response.instance_id,
            template_id: response.template_id,
            template_title: response.template_title,
            confidence,
            justification: response.justification,
            alternatives: response.alternatives,
            questions: response.questions,
            pre_filled: response.pre_filled_variables.unwrap_or_default(),
            draft_markdown: None,
            draft_number: 1,
        }
    }

    /// Confidence to show the user.
    pub fn display_confidence(&self) -> f64 {
        self.confidence.unwrap_or(DEFAULT_DISPLAY_CONFIDENCE)
    }

    /// Justification to show the user.
    pub fn display_justification(&self) -> &str {
        self.justification.as_deref().unwrap_or(DEFAULT_JUSTIFICATION)
    }

    /// Whether finalization has produced a draft.
    pub fn is_drafted(&self) -> bool {
        self.draft_markdown.is_some()
    }

    /// Known value for a variable, as answer text.
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.pre_filled.get(key).and_then(value_text)
    }

    /// Split question keys into filled `(key, value)` pairs and missing keys.
    ///
    /// Every question key lands in exactly one of the two lists.
    pub fn partition_variables(&self) -> (Vec<(&str, String)>, Vec<&str>) {
        let mut filled = Vec::new();
        let mut missing = Vec::new();
        for question in &self.questions {
            let key = question.variable_key.as_str();
            match self.value_of(key) {
                Some(value) => filled.push((key, value)),
                None => missing.push(key),
            }
        }
        (filled, missing)
    }

    /// Markdown summary of filled and missing variables.
    pub fn status_summary(&self) -> String {
        let (filled, missing) = self.partition_variables();

        let filled_list = if filled.is_empty() {
            "None".to_string()
        } else {
            filled.iter().map(|(k, v)| format!("- {k}: {v}")).collect::<Vec<_>>().join("\n")
        };
        let missing_list = if missing.is_empty() {
            "None".to_string()
        } else {
            missing.iter().map(|k| format!("- {k}")).collect::<Vec<_>>().join("\n")
        };

        format!(
            "**Variables Status:**\n\n**Filled ({}):**\n{}\n\n**Missing ({}):**\n{}",
            filled.len(),
            filled_list,
            missing.len(),
            missing_list
        )
    }
}

/// Text form of a variable value; `null` has none.
pub fn value_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Pull "NN% confidence" out of an engine message.
pub fn parse_confidence(message: &str) -> Option<f64> {
    let captures = CONFIDENCE_RE.captures(message)?;
    let percent: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(percent / 100.0)
}

/// Web search results offered after a failed match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebFallback {
    /// The query whose match failed
    pub query: String,
    /// Candidates, in ranking order; may be empty
    pub results: Vec<WebResult>,
}

/// Where the session is in the drafting flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Nothing in progress
    Idle,
    /// A match failed and web results are on offer
    WebSearching,
    /// A template was matched and awaits confirmation
    TemplateProposed,
    /// The question form is showing
    AnsweringQuestions,
    /// A draft has been generated
    DraftReady,
}

/// Severity of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Progress information
    Info,
    /// Something completed
    Success,
    /// Something failed
    Error,
}

/// A transient notification, shown once by the front end and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Short headline
    pub title: String,
    /// Details
    pub description: String,
}

/// Mutable state of one session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) draft: Option<DraftState>,
    /// The user accepted the current template (or arrived by deep link).
    pub(crate) confirmed: bool,
    pub(crate) web: Option<WebFallback>,
    pub(crate) last_query: Option<String>,
    pub(crate) loading: bool,
    pub(crate) generating: bool,
    pub(crate) bootstrapping: Option<String>,
    pub(crate) notices: Vec<Notice>,
}

impl SessionState {
    /// Whether the question form is visible.
    pub fn show_questions(&self) -> bool {
        self.confirmed && self.draft.as_ref().is_some_and(|d| !d.is_drafted())
    }

    /// Current phase, derived from the draft, the confirmation and the fallback.
    pub fn phase(&self) -> Phase {
        match &self.draft {
            Some(draft) if draft.is_drafted() => Phase::DraftReady,
            Some(_) if self.confirmed => Phase::AnsweringQuestions,
            Some(_) => Phase::TemplateProposed,
            None if self.web.is_some() => Phase::WebSearching,
            None => Phase::Idle,
        }
    }

    /// Reply to a status query.
    pub fn status_reply(&self) -> String {
        self.draft.as_ref().map_or_else(|| NO_ACTIVE_DRAFT.to_string(), DraftState::status_summary)
    }

    /// Replace the active draft with a newly resolved one.
    ///
    /// Any pending web results belong to the old request and are dropped.
    pub(crate) fn install_draft(&mut self, draft: DraftState, confirmed: bool) {
        self.draft = Some(draft);
        self.confirmed = confirmed;
        self.web = None;
    }

    /// The active draft, if it is still the one identified by `instance_id`.
    pub(crate) fn draft_for(&mut self, instance_id: &str) -> Option<&mut DraftState> {
        self.draft.as_mut().filter(|d| d.instance_id == instance_id)
    }

    pub(crate) fn say(&mut self, content: impl Into<String>) {
        self.transcript.push(Role::Assistant, content);
    }

    pub(crate) fn notify(
        &mut self,
        level: NoticeLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.notices.push(Notice { level, title: title.into(), description: description.into() });
    }
}

/// Exclusivity keys for in-flight operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Gate {
    /// Draft resolution and web search
    Loading,
    /// Finalize and regenerate
    Generating,
    /// Template bootstrap from the given web result
    Bootstrap(String),
}

/// Holds a gate closed until dropped.
#[derive(Debug)]
pub(crate) struct GateGuard {
    state: Arc<Mutex<SessionState>>,
    gate: Gate,
}

impl GateGuard {
    /// Close `gate`, or return `None` if an operation already holds it.
    pub(crate) fn try_enter(state: &Arc<Mutex<SessionState>>, gate: Gate) -> Option<Self> {
        {
            let mut s = state.lock();
            match &gate {
                Gate::Loading if s.loading => return None,
                Gate::Loading => s.loading = true,
                Gate::Generating if s.generating => return None,
                Gate::Generating => s.generating = true,
                Gate::Bootstrap(_) if s.bootstrapping.is_some() => return None,
                Gate::Bootstrap(id) => s.bootstrapping = Some(id.clone()),
            }
        }
        Some(Self { state: Arc::clone(state), gate })
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        let mut s = self.state.lock();
        match self.gate {
            Gate::Loading => s.loading = false,
            Gate::Generating => s.generating = false,
            Gate::Bootstrap(_) => s.bootstrapping = None,
        }
    }
}
