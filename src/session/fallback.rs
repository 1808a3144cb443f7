//! Web fallback: search the web when no local template matches, then build a
//! template from a chosen result and resume drafting with it.

use super::store::{DraftState, Gate, Phase, WebFallback};
use super::{DraftSession, NoticeLevel, SessionError, SessionResult, REMEDIATION_HINTS};

impl DraftSession {
    /// Search the web for `query` after a failed match. The loading gate
    /// must already be held.
    ///
    /// The failed request abandons any previous draft. A search failure is
    /// reported, never returned: the session ends in `WebSearching` either way.
    pub(super) async fn search_web_fallback(&self, query: &str) -> SessionResult<Phase> {
        self.with_state(|s| {
            s.draft = None;
            s.confirmed = false;
            s.web = Some(WebFallback { query: query.to_string(), results: Vec::new() });
            s.say("No local template found. Let me search the web for similar documents...");
        });

        let outcome = self.engine.search_web(query, self.config.web_results_limit).await;

        self.with_state(|s| {
            let results = match outcome {
                Ok(results) if !results.is_empty() => {
                    tracing::info!(%query, count = results.len(), "Web results found");
                    s.say(format!(
                        "Found {} similar documents online. Pick one to create a template from it and continue drafting.",
                        results.len()
                    ));
                    results
                }
                Ok(_) => {
                    tracing::info!(%query, "No web results");
                    s.say("No similar documents found on the web. Please try:\n- Uploading a template manually\n- Broadening your search terms\n- Being more specific about document type");
                    Vec::new()
                }
                Err(err) => {
                    tracing::warn!(%query, error = %err, "Web search failed");
                    s.say(format!("Sorry, web search is currently unavailable. {REMEDIATION_HINTS}"));
                    s.notify(NoticeLevel::Error, "Web search failed", err.to_string());
                    Vec::new()
                }
            };
            s.web = Some(WebFallback { query: query.to_string(), results });
        });

        Ok(Phase::WebSearching)
    }

    /// Create a template from the web result `result_id`, then re-run the
    /// original query against it.
    ///
    /// Only one bootstrap runs at a time. On failure the results stay on
    /// offer so another one can be tried.
    pub async fn bootstrap(&self, result_id: &str) -> SessionResult<Phase> {
        let (result, query) = self
            .with_state(|s| {
                let web = s.web.as_ref()?;
                let result = web.results.iter().find(|r| r.id == result_id)?.clone();
                Some((result, web.query.clone()))
            })
            .ok_or_else(|| SessionError::UnknownWebResult(result_id.to_string()))?;

        let Some(bootstrapping) = self.enter(Gate::Bootstrap(result.id.clone())) else {
            return Err(SessionError::BootstrapInFlight);
        };

        self.say(format!(
            "Creating template from \"{}\"... This may take 30-60 seconds.",
            result.title
        ));

        let created = match self.engine.bootstrap_from_web(&result.id, &result.url, &result.title).await {
            Ok(created) => created,
            Err(err) => {
                tracing::warn!(result_id, error = %err, "Bootstrap failed");
                self.with_state(|s| {
                    s.say(format!(
                        "Could not create template from \"{}\": {err}\n\nTry selecting another result, or upload your template directly.",
                        result.title
                    ));
                    s.notify(
                        NoticeLevel::Error,
                        "Template creation failed",
                        "This document didn't work. Try another result.",
                    );
                });
                return Err(err.into());
            }
        };
        drop(bootstrapping);

        tracing::info!(
            template_id = %created.template_id,
            variables = created.variables_count,
            "Template bootstrapped from web"
        );
        let still_pending = self.with_state(|s| {
            s.notify(
                NoticeLevel::Success,
                "Template created!",
                format!("{} with {} variables", created.template_id, created.variables_count),
            );
            s.say(format!(
                "Template created successfully! Template ID: {} with {} variables.\n\nNow let's draft your document...",
                created.template_id, created.variables_count
            ));
            match s.web.as_mut() {
                Some(web) if web.query == query => {
                    web.results.clear();
                    true
                }
                _ => false,
            }
        });
        if !still_pending {
            tracing::debug!(%query, "Fallback superseded during bootstrap, not resuming");
            return Ok(self.phase());
        }

        // Let the success message reach the user before the next step
        let delay = self.config.bootstrap_resume_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.resume_after_bootstrap(&query).await
    }

    /// Re-run the query that fell back to the web, now that a template
    /// exists for it. A failure here ends the fallback; it never re-enters it.
    async fn resume_after_bootstrap(&self, query: &str) -> SessionResult<Phase> {
        let Some(_loading) = self.enter(Gate::Loading) else {
            self.say("Another draft request is in progress. Send your request again once it finishes.");
            return Err(SessionError::Busy);
        };

        match self.engine.create_draft(query).await {
            Ok(response) => {
                let message = response.message.clone();
                let draft = DraftState::from_response(response);
                tracing::info!(template_id = %draft.template_id, "Resumed drafting after bootstrap");
                self.with_state(|s| {
                    s.install_draft(draft, false);
                    s.say(format!("Great! Now let's draft your document. {message}"));
                });
                Ok(Phase::TemplateProposed)
            }
            Err(err) => {
                tracing::warn!(%query, error = %err, "Draft after bootstrap failed");
                self.with_state(|s| {
                    s.web = None;
                    s.say(format!("Failed to start draft: {err}"));
                    s.notify(NoticeLevel::Error, "Failed to start draft", err.to_string());
                });
                Err(err.into())
            }
        }
    }
}
