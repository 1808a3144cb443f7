//! Draft engine interface.
//!
//! The engine matches queries to templates, extracts variables, renders
//! drafts and bootstraps templates from web documents. All of that happens
//! server-side; this module only describes how the session talks to it.
//!
//! ## Implementations
//!
//! - [`HttpEngine`] - the engine's REST API over `reqwest`
//! - anything else implementing [`DraftEngine`] (tests use a scripted one)

mod error;
mod http;
mod types;

pub use error::{EngineError, EngineErrorKind, EngineResult};
pub use http::HttpEngine;
pub use types::{
    Alternative, BootstrapRequest, BootstrappedTemplate, CreateDraftRequest, DraftResponse,
    DraftVariables, FinalDraft, FinalizeRequest, Question, RegeneratedDraft, VariableMap,
    WebResult, WebSearchRequest, WebSearchResponse,
};

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Trait for draft engines.
#[async_trait]
pub trait DraftEngine: Send + Sync {
    /// Match a template for free text and open a draft instance on it.
    async fn create_draft(&self, user_query: &str) -> EngineResult<DraftResponse>;

    /// Open a draft instance on a known template.
    async fn create_draft_with_template(&self, template_id: &str) -> EngineResult<DraftResponse>;

    /// Render the draft from the submitted answers.
    async fn finalize_draft(
        &self,
        instance_id: &str,
        answers: &BTreeMap<String, String>,
        strict_replace: bool,
    ) -> EngineResult<FinalDraft>;

    /// Render the draft again from the answers the engine already holds.
    async fn regenerate_draft(&self, instance_id: &str) -> EngineResult<RegeneratedDraft>;

    /// Fetch the engine's current questions and values for a draft.
    async fn edit_draft_variables(&self, instance_id: &str) -> EngineResult<DraftVariables>;

    /// Render the draft as a DOCX document.
    async fn download_docx(&self, instance_id: &str) -> EngineResult<Vec<u8>>;

    /// Search the web for documents similar to the query.
    async fn search_web(&self, query: &str, limit: usize) -> EngineResult<Vec<WebResult>>;

    /// Create a template from a web document.
    async fn bootstrap_from_web(
        &self,
        document_id: &str,
        document_url: &str,
        title: &str,
    ) -> EngineResult<BootstrappedTemplate>;

    /// Check that the engine is up.
    async fn health(&self) -> EngineResult<serde_json::Value>;

    /// Get the engine name, for logs.
    fn name(&self) -> &str;
}
