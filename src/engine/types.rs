//! Wire types exchanged with the draft engine.
//!
//! Field names follow the engine's snake_case JSON. Optional fields default so
//! that older engine builds which omit them still decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variable values keyed by variable key.
///
/// Values are loosely typed on the wire; `null` means "not known yet".
pub type VariableMap = BTreeMap<String, serde_json::Value>;

/// A question for one unresolved template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Variable this question fills
    pub variable_key: String,
    /// Human-readable question text
    #[serde(rename = "question")]
    pub question_text: String,
    /// Optional hint about the expected format (e.g. "DD/MM/YYYY")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_hint: Option<String>,
}

impl Question {
    /// Create a question without a format hint.
    pub fn new(variable_key: impl Into<String>, question_text: impl Into<String>) -> Self {
        Self { variable_key: variable_key.into(), question_text: question_text.into(), format_hint: None }
    }

    /// Attach a format hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }
}

/// A candidate template offered next to the best match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    /// Template identifier
    pub template_id: String,
    /// Template title
    pub title: String,
    /// Document type (e.g. "notice", "agreement")
    #[serde(default)]
    pub doc_type: Option<String>,
}

/// Request body for creating a draft instance.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CreateDraftRequest {
    /// Match a template from free text
    ByQuery {
        /// The user's request text
        user_query: String,
    },
    /// Use a known template
    ByTemplate {
        /// Template identifier
        template_id: String,
    },
}

/// Response of draft creation and of the edit-variables call.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftResponse {
    /// Handle for all later calls on this draft
    pub instance_id: String,
    /// Matched template identifier
    pub template_id: String,
    /// Matched template title
    pub template_title: String,
    /// Values the engine already knows
    #[serde(default)]
    pub pre_filled_variables: Option<VariableMap>,
    /// Keys without a value
    #[serde(default)]
    pub missing_variables: Vec<String>,
    /// One question per unresolved variable
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Rendered draft, if the engine already has one
    #[serde(default)]
    pub draft_md: Option<String>,
    /// Explanatory text for the user
    #[serde(default)]
    pub message: String,
    /// Other candidate templates
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    /// Match quality in [0, 1], when the engine reports it structurally
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Rationale for the match, when the engine reports it structurally
    #[serde(default)]
    pub justification: Option<String>,
}

/// Request body for finalization.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeRequest {
    /// Draft instance
    pub instance_id: String,
    /// Submitted answers
    pub answers: BTreeMap<String, String>,
    /// Substitute variables literally instead of allowing rewrites
    pub strict_replace: bool,
}

/// Response of finalization.
#[derive(Debug, Clone, Deserialize)]
pub struct FinalDraft {
    /// Draft instance
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Rendered markdown
    pub draft_md: String,
    /// Engine-side draft counter
    #[serde(default = "default_draft_number")]
    pub draft_number: u32,
    /// Status text
    #[serde(default)]
    pub message: String,
}

/// Response of regeneration.
///
/// The engine may also report a draft number; the session ignores it and
/// counts regenerations locally.
#[derive(Debug, Clone, Deserialize)]
pub struct RegeneratedDraft {
    /// Rendered markdown
    pub draft_md: String,
    /// Status text
    #[serde(default)]
    pub message: String,
    /// Engine-side draft counter, informational only
    #[serde(default)]
    pub draft_number: Option<u32>,
}

/// Current variable state of a draft, returned by the edit call.
#[derive(Debug, Clone)]
pub struct DraftVariables {
    /// Questions for every variable of the template
    pub questions: Vec<Question>,
    /// Values the engine currently holds
    pub pre_filled: VariableMap,
}

impl From<DraftResponse> for DraftVariables {
    fn from(response: DraftResponse) -> Self {
        Self { questions: response.questions, pre_filled: response.pre_filled_variables.unwrap_or_default() }
    }
}

/// Request body for a web search.
#[derive(Debug, Clone, Serialize)]
pub struct WebSearchRequest {
    /// Search text
    pub query: String,
    /// Maximum results wanted
    pub num_results: usize,
}

/// A document found by the web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    /// Search-provider document id, used for bootstrap
    pub id: String,
    /// Document title
    pub title: String,
    /// Document URL
    pub url: String,
    /// Short excerpt
    #[serde(default)]
    pub snippet: String,
    /// Publication date, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Response of a web search.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchResponse {
    /// Results in ranking order
    #[serde(default)]
    pub results: Vec<WebResult>,
    /// Status text
    #[serde(default)]
    pub message: String,
}

/// Request body for bootstrapping a template from a web document.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapRequest {
    /// Search-provider document id
    pub document_id: String,
    /// Document URL
    pub document_url: String,
    /// Document title
    pub title: String,
}

/// Response of a successful bootstrap.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrappedTemplate {
    /// Identifier of the new template
    pub template_id: String,
    /// Title of the new template
    #[serde(default)]
    pub title: String,
    /// Number of variables extracted
    #[serde(default)]
    pub variables_count: usize,
    /// Status text
    #[serde(default)]
    pub message: String,
}

fn default_draft_number() -> u32 {
    1
}
