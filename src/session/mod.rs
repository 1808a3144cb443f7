//! Draft session orchestrator.
//!
//! A [`DraftSession`] turns user actions (free text, slash commands, form
//! submissions, button presses) into a drafting session against a
//! [`DraftEngine`]:
//!
//! ```text
//! Idle -> TemplateProposed -> AnsweringQuestions -> DraftReady <-> (edit) AnsweringQuestions
//!   \-> WebSearching -> (bootstrap) -> TemplateProposed | Idle
//! ```
//!
//! The session is a cheap-to-clone handle. Operations take `&self`, so a
//! front end can keep issuing actions while an engine call is in flight; the
//! in-flight gates decide what is admitted:
//!
//! - draft resolution and web search share one gate,
//! - finalize and regenerate share another,
//! - template bootstrap admits one web result at a time.
//!
//! No operation fails the session. Engine failures land in the transcript
//! and as [`Notice`]s, and the session stays usable.

mod answers;
mod command;
mod fallback;
mod lifecycle;
mod resolve;
mod store;

pub use answers::AnswerForm;
pub use command::{interpret, Intent, DRAFT_USAGE};
pub use lifecycle::{ExportArtifact, ExportFormat};
pub use store::{
    parse_confidence, value_text, DraftState, Message, Notice, NoticeLevel, Phase, Role,
    Transcript, WebFallback, DEFAULT_DISPLAY_CONFIDENCE, DEFAULT_JUSTIFICATION, NO_ACTIVE_DRAFT,
};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::SessionConfig;
use crate::engine::{DraftEngine, EngineError, WebResult};
use store::{Gate, GateGuard, SessionState};

/// Opening message of a new session.
pub const GREETING: &str = "Hello! I can help you draft legal documents. Tell me what document you need, for example:\n\n- `/draft` a notice to insurer for a motor accident in India\n- Create a rental agreement for Mumbai\n- Generate an employment contract\n\nYou can also type `/vars` anytime to see your progress.";

/// Suggestions appended to failure messages.
pub const REMEDIATION_HINTS: &str = "Please try:\n- Uploading a template first if none exist\n- Being more specific about the document type\n- Including jurisdiction or document details";

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Why a session operation did not complete.
///
/// By the time one of these is returned the user has already been told
/// (transcript or notice) where that is appropriate.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("A draft request is already in progress")]
    Busy,

    #[error("A draft is already being generated")]
    Generating,

    #[error("A template is already being created from a web result")]
    BootstrapInFlight,

    #[error("Usage: /draft <document description>")]
    EmptyDraftCommand,

    #[error("No active draft")]
    NoActiveDraft,

    #[error("No template match is waiting for confirmation")]
    NothingToConfirm,

    #[error("The question form is not open")]
    NotAnswering,

    #[error("The draft has not been generated yet")]
    NotDrafted,

    #[error("Missing answers for: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    #[error("The draft was replaced while the request was in flight")]
    Superseded,

    #[error("Unknown web result: {0}")]
    UnknownWebResult(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    /// Whether the transcript already tells the user about this failure.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::EmptyDraftCommand | Self::MissingAnswers(_))
    }
}

/// One drafting session.
#[derive(Clone)]
pub struct DraftSession {
    engine: Arc<dyn DraftEngine>,
    state: Arc<Mutex<SessionState>>,
    config: SessionConfig,
}

impl std::fmt::Debug for DraftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftSession")
            .field("engine", &self.engine.name())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl DraftSession {
    /// Start a session against `engine`.
    pub fn new(engine: Arc<dyn DraftEngine>, config: SessionConfig) -> Self {
        let mut state = SessionState::default();
        if config.greeting {
            state.say(GREETING);
        }
        Self { engine, state: Arc::new(Mutex::new(state)), config }
    }

    /// Handle one line of user input.
    ///
    /// Ignored (with [`SessionError::Busy`]) while another draft request is
    /// in flight; otherwise the line is appended to the transcript and
    /// interpreted. Returns the phase the session ends in.
    pub async fn send(&self, raw: &str) -> SessionResult<Phase> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let Some(_loading) = self.enter(Gate::Loading) else {
            tracing::debug!("Input ignored, draft request in flight");
            return Err(SessionError::Busy);
        };

        self.with_state(|s| s.transcript.push(Role::User, input));

        match interpret(input) {
            Intent::StatusQuery => {
                self.with_state(|s| {
                    let reply = s.status_reply();
                    s.say(reply);
                });
                Ok(self.phase())
            }
            Intent::InvalidDraftCommand => {
                self.say(DRAFT_USAGE);
                Err(SessionError::EmptyDraftCommand)
            }
            Intent::DraftRequest { query, explicit } => {
                tracing::debug!(%query, explicit, "Draft request");
                self.resolve_by_query(&query).await
            }
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().phase()
    }

    /// Whether the question form is visible.
    pub fn show_questions(&self) -> bool {
        self.state.lock().show_questions()
    }

    /// Snapshot of the active draft.
    pub fn draft(&self) -> Option<DraftState> {
        self.state.lock().draft.clone()
    }

    /// Pending web results (empty when none are on offer).
    pub fn web_results(&self) -> Vec<WebResult> {
        self.state.lock().web.as_ref().map(|w| w.results.clone()).unwrap_or_default()
    }

    /// The most recent draft request text.
    pub fn last_query(&self) -> Option<String> {
        self.state.lock().last_query.clone()
    }

    /// Whether a draft request or web search is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Whether finalize or regenerate is in flight.
    pub fn is_generating(&self) -> bool {
        self.state.lock().generating
    }

    /// The web result currently being bootstrapped.
    pub fn bootstrapping(&self) -> Option<String> {
        self.state.lock().bootstrapping.clone()
    }

    /// Number of transcript messages.
    pub fn transcript_len(&self) -> usize {
        self.state.lock().transcript.len()
    }

    /// Copy of the whole transcript.
    pub fn transcript(&self) -> Transcript {
        self.state.lock().transcript.clone()
    }

    /// Messages appended after the first `start`.
    pub fn messages_since(&self, start: usize) -> Vec<Message> {
        self.state.lock().transcript.since(start).to_vec()
    }

    /// Take the pending notifications.
    pub fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().notices)
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.state.lock())
    }

    fn say(&self, content: impl Into<String>) {
        self.state.lock().say(content);
    }

    fn notify(&self, level: NoticeLevel, title: impl Into<String>, description: impl Into<String>) {
        self.state.lock().notify(level, title, description);
    }

    fn enter(&self, gate: Gate) -> Option<GateGuard> {
        GateGuard::try_enter(&self.state, gate)
    }
}
