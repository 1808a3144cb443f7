//! Shared test support: a scripted in-memory draft engine.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;

use draftchat::core::SessionConfig;
use draftchat::engine::{
    BootstrappedTemplate, DraftEngine, DraftResponse, DraftVariables, EngineError,
    EngineErrorKind, EngineResult, FinalDraft, RegeneratedDraft, WebResult,
};
use draftchat::DraftSession;

/// Engine methods, for scripting holds and counting calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    CreateDraft,
    CreateWithTemplate,
    Finalize,
    Regenerate,
    Edit,
    Docx,
    Search,
    Bootstrap,
}

/// Engine whose answers are queued up front by the test.
///
/// Each call pops the next scripted answer for its method; an unscripted
/// call fails with a generic error.
#[derive(Default)]
pub struct ScriptedEngine {
    drafts: Mutex<VecDeque<EngineResult<DraftResponse>>>,
    by_template: Mutex<VecDeque<EngineResult<DraftResponse>>>,
    finals: Mutex<VecDeque<EngineResult<FinalDraft>>>,
    regens: Mutex<VecDeque<EngineResult<RegeneratedDraft>>>,
    edits: Mutex<VecDeque<EngineResult<DraftVariables>>>,
    docx: Mutex<VecDeque<EngineResult<Vec<u8>>>>,
    searches: Mutex<VecDeque<EngineResult<Vec<WebResult>>>>,
    bootstraps: Mutex<VecDeque<EngineResult<BootstrappedTemplate>>>,
    holds: Mutex<HashMap<Call, Arc<Notify>>>,
    calls: Mutex<Vec<(Call, String)>>,
    finalized: Mutex<Vec<(BTreeMap<String, String>, bool)>>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_draft(&self, result: EngineResult<DraftResponse>) {
        self.drafts.lock().push_back(result);
    }

    pub fn push_template(&self, result: EngineResult<DraftResponse>) {
        self.by_template.lock().push_back(result);
    }

    pub fn push_final(&self, result: EngineResult<FinalDraft>) {
        self.finals.lock().push_back(result);
    }

    pub fn push_regen(&self, result: EngineResult<RegeneratedDraft>) {
        self.regens.lock().push_back(result);
    }

    pub fn push_edit(&self, result: EngineResult<DraftVariables>) {
        self.edits.lock().push_back(result);
    }

    pub fn push_docx(&self, result: EngineResult<Vec<u8>>) {
        self.docx.lock().push_back(result);
    }

    pub fn push_search(&self, result: EngineResult<Vec<WebResult>>) {
        self.searches.lock().push_back(result);
    }

    pub fn push_bootstrap(&self, result: EngineResult<BootstrappedTemplate>) {
        self.bootstraps.lock().push_back(result);
    }

    /// Make calls of `call` wait until the returned handle is notified.
    pub fn hold(&self, call: Call) -> Arc<Notify> {
        Arc::clone(self.holds.lock().entry(call).or_insert_with(|| Arc::new(Notify::new())))
    }

    /// Number of calls made to `call`.
    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|(c, _)| *c == call).count()
    }

    /// Arguments of every call to `call`, in order.
    pub fn args(&self, call: Call) -> Vec<String> {
        self.calls.lock().iter().filter(|(c, _)| *c == call).map(|(_, a)| a.clone()).collect()
    }

    /// Answers and strict flag of every finalize call.
    pub fn finalized(&self) -> Vec<(BTreeMap<String, String>, bool)> {
        self.finalized.lock().clone()
    }

    async fn enter(&self, call: Call, arg: impl Into<String>) {
        self.calls.lock().push((call, arg.into()));
        let hold = self.holds.lock().get(&call).cloned();
        if let Some(notify) = hold {
            notify.notified().await;
        }
    }
}

fn next<T>(queue: &Mutex<VecDeque<EngineResult<T>>>, call: Call) -> EngineResult<T> {
    queue.lock().pop_front().unwrap_or_else(|| {
        Err(EngineError::with_kind(EngineErrorKind::Other, format!("unscripted call: {call:?}")))
    })
}

#[async_trait]
impl DraftEngine for ScriptedEngine {
    async fn create_draft(&self, user_query: &str) -> EngineResult<DraftResponse> {
        self.enter(Call::CreateDraft, user_query).await;
        next(&self.drafts, Call::CreateDraft)
    }

    async fn create_draft_with_template(&self, template_id: &str) -> EngineResult<DraftResponse> {
        self.enter(Call::CreateWithTemplate, template_id).await;
        next(&self.by_template, Call::CreateWithTemplate)
    }

    async fn finalize_draft(
        &self,
        instance_id: &str,
        answers: &BTreeMap<String, String>,
        strict_replace: bool,
    ) -> EngineResult<FinalDraft> {
        self.enter(Call::Finalize, instance_id).await;
        self.finalized.lock().push((answers.clone(), strict_replace));
        next(&self.finals, Call::Finalize)
    }

    async fn regenerate_draft(&self, instance_id: &str) -> EngineResult<RegeneratedDraft> {
        self.enter(Call::Regenerate, instance_id).await;
        next(&self.regens, Call::Regenerate)
    }

    async fn edit_draft_variables(&self, instance_id: &str) -> EngineResult<DraftVariables> {
        self.enter(Call::Edit, instance_id).await;
        next(&self.edits, Call::Edit)
    }

    async fn download_docx(&self, instance_id: &str) -> EngineResult<Vec<u8>> {
        self.enter(Call::Docx, instance_id).await;
        next(&self.docx, Call::Docx)
    }

    async fn search_web(&self, query: &str, limit: usize) -> EngineResult<Vec<WebResult>> {
        self.enter(Call::Search, format!("{query}|{limit}")).await;
        next(&self.searches, Call::Search)
    }

    async fn bootstrap_from_web(
        &self,
        document_id: &str,
        _document_url: &str,
        _title: &str,
    ) -> EngineResult<BootstrappedTemplate> {
        self.enter(Call::Bootstrap, document_id).await;
        next(&self.bootstraps, Call::Bootstrap)
    }

    async fn health(&self) -> EngineResult<serde_json::Value> {
        Ok(json!({"status": "healthy"}))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Session settings for tests: no greeting, no resume delay.
pub fn test_config() -> SessionConfig {
    SessionConfig { greeting: false, bootstrap_resume_delay_ms: 0, ..SessionConfig::default() }
}

pub fn session(engine: &Arc<ScriptedEngine>) -> DraftSession {
    DraftSession::new(Arc::clone(engine) as Arc<dyn DraftEngine>, test_config())
}

/// A matched draft with two questions, one of them pre-filled.
pub fn rental_match() -> DraftResponse {
    draft_response(json!({
        "instance_id": "inst-1",
        "template_id": "rental_agreement",
        "template_title": "Rental Agreement",
        "pre_filled_variables": {"city": "Mumbai", "landlord_name": null},
        "missing_variables": ["landlord_name"],
        "questions": [
            {"variable_key": "landlord_name", "question": "What is the landlord's name?"},
            {"variable_key": "city", "question": "Which city is the property in?"}
        ],
        "message": "Matched template 'Rental Agreement' with 82% confidence. 1 questions to answer.",
        "alternatives": [
            {"template_id": "leave_license", "title": "Leave and License Agreement", "doc_type": "agreement"}
        ]
    }))
}

/// A draft response for `template_id` with one question.
pub fn template_match(instance_id: &str, template_id: &str, title: &str) -> DraftResponse {
    draft_response(json!({
        "instance_id": instance_id,
        "template_id": template_id,
        "template_title": title,
        "questions": [{"variable_key": "party_name", "question": "Who is the party?"}],
        "message": format!("Matched template '{title}'."),
        "alternatives": []
    }))
}

pub fn draft_response(value: serde_json::Value) -> DraftResponse {
    serde_json::from_value(value).expect("valid draft response")
}

pub fn final_draft(markdown: &str, number: u32) -> FinalDraft {
    serde_json::from_value(json!({"draft_md": markdown, "draft_number": number, "message": "ok"}))
        .expect("valid final draft")
}

pub fn regenerated(markdown: &str, reported: u32) -> RegeneratedDraft {
    serde_json::from_value(json!({"draft_md": markdown, "draft_number": reported, "message": "ok"}))
        .expect("valid regenerated draft")
}

pub fn web_result(id: &str, title: &str) -> WebResult {
    WebResult {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://example.com/{id}"),
        snippet: String::new(),
        published_date: None,
    }
}

pub fn bootstrapped(template_id: &str, variables: usize) -> BootstrappedTemplate {
    serde_json::from_value(json!({
        "template_id": template_id,
        "title": "Imported",
        "variables_count": variables,
        "message": "Template created"
    }))
    .expect("valid bootstrap response")
}

/// The engine's legacy low-confidence failure.
pub fn low_confidence() -> EngineError {
    EngineError::api(
        404,
        None,
        "No suitable template found (confidence < 0.6). Try uploading a template or broadening your request.",
    )
}

pub fn server_error(message: &str) -> EngineError {
    EngineError::api(500, None, message)
}

/// Answers for every question of [`rental_match`].
pub fn rental_answers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("landlord_name".to_string(), "R. Sharma".to_string()),
        ("city".to_string(), "Mumbai".to_string()),
    ])
}

/// Drive a session from a fresh match to a generated draft #1.
pub async fn drafted_session(engine: &Arc<ScriptedEngine>) -> DraftSession {
    let session = session(engine);
    engine.push_draft(Ok(rental_match()));
    engine.push_final(Ok(final_draft("# Rental Agreement\n\nLandlord: R. Sharma", 1)));

    session.send("rental agreement for Mumbai").await.expect("match");
    session.confirm_template().expect("confirm");
    session.submit(rental_answers(), true).await.expect("finalize");
    session
}
