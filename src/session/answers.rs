//! Question/answer flow: collect answers for the open questions and turn
//! them into a draft.

use std::collections::BTreeMap;

use super::store::{value_text, DraftState, Gate};
use super::{DraftSession, NoticeLevel, SessionError, SessionResult};
use crate::engine::Question;

/// Editable answers for the current questions.
///
/// Seeded with everything the engine already knows, so untouched questions
/// keep their pre-filled value on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerForm {
    questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    strict_replace: bool,
}

impl AnswerForm {
    /// Form for `draft`, pre-filled from its known values.
    pub fn seeded(draft: &DraftState, strict_replace: bool) -> Self {
        let answers = draft
            .pre_filled
            .iter()
            .filter_map(|(key, value)| value_text(value).map(|text| (key.clone(), text)))
            .collect();
        Self { questions: draft.questions.clone(), answers, strict_replace }
    }

    /// Questions in display order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Current answer for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.answers.get(key).map(String::as_str)
    }

    /// Set the answer for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.answers.insert(key.into(), value.into());
    }

    /// Whether variables are substituted literally.
    pub fn strict_replace(&self) -> bool {
        self.strict_replace
    }

    /// Choose literal substitution (`true`) or allow rewording (`false`).
    pub fn set_strict_replace(&mut self, strict: bool) {
        self.strict_replace = strict;
    }

    /// Keys of displayed questions that have no usable answer.
    pub fn missing(&self) -> Vec<String> {
        missing_answers(&self.questions, &self.answers)
    }

    /// All answers, including pre-filled values without a question.
    pub fn answers(&self) -> &BTreeMap<String, String> {
        &self.answers
    }

    /// Take the answers out of the form.
    pub fn into_answers(self) -> BTreeMap<String, String> {
        self.answers
    }
}

/// Every displayed question is required; blank answers count as missing.
fn missing_answers(questions: &[Question], answers: &BTreeMap<String, String>) -> Vec<String> {
    questions
        .iter()
        .filter(|q| answers.get(&q.variable_key).map_or(true, |a| a.trim().is_empty()))
        .map(|q| q.variable_key.clone())
        .collect()
}

impl DraftSession {
    /// The question form, when it is showing.
    pub fn answer_form(&self) -> Option<AnswerForm> {
        let strict = self.config.strict_replace;
        self.with_state(|s| {
            if !s.show_questions() {
                return None;
            }
            s.draft.as_ref().map(|draft| AnswerForm::seeded(draft, strict))
        })
    }

    /// Submit a filled form.
    pub async fn submit_form(&self, form: AnswerForm) -> SessionResult<u32> {
        let strict = form.strict_replace();
        self.submit(form.into_answers(), strict).await
    }

    /// Finalize the draft with `answers`.
    ///
    /// Blank or absent answers to displayed questions are rejected before
    /// any engine call. On success the submitted answers become the draft's
    /// known values and the draft number is returned.
    pub async fn submit(
        &self,
        answers: BTreeMap<String, String>,
        strict_replace: bool,
    ) -> SessionResult<u32> {
        let instance_id = self.with_state(|s| {
            if !s.show_questions() {
                return Err(SessionError::NotAnswering);
            }
            let draft = s.draft.as_ref().ok_or(SessionError::NoActiveDraft)?;
            let missing = missing_answers(&draft.questions, &answers);
            if !missing.is_empty() {
                s.say(format!(
                    "Please answer every question before generating the draft. Missing: {}",
                    missing.join(", ")
                ));
                return Err(SessionError::MissingAnswers(missing));
            }
            Ok(draft.instance_id.clone())
        })?;

        let Some(_generating) = self.enter(Gate::Generating) else {
            return Err(SessionError::Generating);
        };

        tracing::debug!(%instance_id, strict_replace, answers = answers.len(), "Finalizing draft");
        match self.engine.finalize_draft(&instance_id, &answers, strict_replace).await {
            Ok(finalized) => self.with_state(|s| {
                let Some(draft) = s.draft_for(&instance_id) else {
                    tracing::warn!(%instance_id, "Draft replaced while finalizing, result dropped");
                    return Err(SessionError::Superseded);
                };
                draft.draft_markdown = Some(finalized.draft_md);
                draft.draft_number = finalized.draft_number;
                draft.pre_filled = answers
                    .into_iter()
                    .map(|(key, value)| (key, serde_json::Value::String(value)))
                    .collect();
                let number = draft.draft_number;

                tracing::info!(%instance_id, draft_number = number, "Draft ready");
                let mode = if strict_replace { " (strict replacement mode)" } else { "" };
                s.say(format!(
                    "Excellent! Your draft is ready{mode}. You can copy it, download it, or make changes."
                ));
                s.notify(NoticeLevel::Success, "Draft generated", "Your document has been generated successfully");
                Ok(number)
            }),
            Err(err) => {
                tracing::warn!(%instance_id, error = %err, "Finalize failed");
                self.with_state(|s| {
                    s.say(format!("Sorry, I couldn't generate the draft: {err}"));
                    s.notify(NoticeLevel::Error, "Generation failed", err.to_string());
                });
                Err(err.into())
            }
        }
    }
}
