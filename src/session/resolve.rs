//! Template resolution: by query, by template id, or by picking an alternative.

use super::store::{DraftState, Gate, Phase};
use super::{DraftSession, NoticeLevel, SessionError, SessionResult, REMEDIATION_HINTS};

impl DraftSession {
    /// Match a template for `query`. The loading gate must already be held.
    ///
    /// A no-match or low-confidence failure is not an error here: it hands
    /// the query to the web fallback.
    pub(super) async fn resolve_by_query(&self, query: &str) -> SessionResult<Phase> {
        self.with_state(|s| s.last_query = Some(query.to_string()));

        match self.engine.create_draft(query).await {
            Ok(response) => {
                let message = response.message.clone();
                let draft = DraftState::from_response(response);
                tracing::info!(
                    template_id = %draft.template_id,
                    instance_id = %draft.instance_id,
                    confidence = ?draft.confidence,
                    "Template proposed"
                );
                self.with_state(|s| {
                    s.install_draft(draft, false);
                    s.say(format!("Great! I found a matching template. {message}"));
                });
                Ok(Phase::TemplateProposed)
            }
            Err(err) if err.kind().triggers_web_fallback() => {
                tracing::info!(%query, kind = %err.kind(), "No local template, falling back to web search");
                self.search_web_fallback(query).await
            }
            Err(err) => {
                tracing::warn!(%query, error = %err, "Draft request failed");
                self.with_state(|s| {
                    s.say(format!(
                        "Sorry, I couldn't process your request: {err}\n\n{REMEDIATION_HINTS}"
                    ));
                    s.notify(NoticeLevel::Error, "Draft request failed", err.to_string());
                });
                Err(err.into())
            }
        }
    }

    /// Open a draft directly on a known template (deep link).
    ///
    /// The template was chosen explicitly, so the session goes straight to
    /// the question form.
    pub async fn open_template(&self, template_id: &str) -> SessionResult<Phase> {
        let Some(_loading) = self.enter(Gate::Loading) else {
            return Err(SessionError::Busy);
        };

        match self.engine.create_draft_with_template(template_id).await {
            Ok(response) => {
                let draft = DraftState::from_response(response);
                tracing::info!(template_id, instance_id = %draft.instance_id, "Template loaded");
                self.with_state(|s| {
                    s.say(format!(
                        "Perfect! I've loaded the {} template. Please answer the following questions to complete your document:",
                        draft.template_title
                    ));
                    s.install_draft(draft, true);
                });
                Ok(Phase::AnsweringQuestions)
            }
            Err(err) => {
                tracing::warn!(template_id, error = %err, "Failed to load template");
                self.with_state(|s| {
                    s.say(format!("Sorry, I couldn't load template '{template_id}': {err}"));
                    s.notify(NoticeLevel::Error, "Failed to load template", err.to_string());
                });
                Err(err.into())
            }
        }
    }

    /// Accept the proposed template and open the question form.
    ///
    /// Everything the form needs came with the match; no engine call.
    pub fn confirm_template(&self) -> SessionResult<Phase> {
        self.with_state(|s| {
            if s.phase() != Phase::TemplateProposed {
                return Err(SessionError::NothingToConfirm);
            }
            s.confirmed = true;
            s.say("Perfect! Now I need some information to complete the draft. Please answer the following questions:");
            Ok(Phase::AnsweringQuestions)
        })
    }

    /// Switch to another template, replacing the current draft wholesale.
    ///
    /// The new match is shown for confirmation before its questions.
    pub async fn select_alternative(&self, template_id: &str) -> SessionResult<Phase> {
        let Some(_loading) = self.enter(Gate::Loading) else {
            return Err(SessionError::Busy);
        };
        self.notify(NoticeLevel::Info, "Switching template", "Loading alternative template...");

        match self.engine.create_draft_with_template(template_id).await {
            Ok(response) => {
                let message = response.message.clone();
                let draft = DraftState::from_response(response);
                tracing::info!(template_id, instance_id = %draft.instance_id, "Switched template");
                self.with_state(|s| {
                    s.say(format!(
                        "Perfect! I've switched to the \"{}\" template. {message}",
                        draft.template_title
                    ));
                    s.notify(
                        NoticeLevel::Success,
                        "Template switched",
                        format!("Now using: {}", draft.template_title),
                    );
                    s.install_draft(draft, false);
                });
                Ok(Phase::TemplateProposed)
            }
            Err(err) => {
                tracing::warn!(template_id, error = %err, "Failed to switch template");
                self.with_state(|s| {
                    s.say("Sorry, I couldn't switch to that template. Please try again.");
                    s.notify(NoticeLevel::Error, "Failed to switch template", err.to_string());
                });
                Err(err.into())
            }
        }
    }
}
