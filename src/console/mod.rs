//! Line-oriented front end for a [`DraftSession`].
//!
//! Reads one line at a time, hands chat input to the session and `:` lines
//! to [`Action`]s, then prints whatever the session appended to the
//! transcript along with pending notices. Generic over the reader and
//! writer so it can be driven from tests.

mod action;

pub use action::{Action, ACTION_PREFIX, HELP};

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use crate::session::{
    AnswerForm, DraftSession, NoticeLevel, Phase, Role, SessionError, SessionResult,
};

/// Whether to keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Interactive console over a session.
pub struct Console<R, W> {
    session: DraftSession,
    input: R,
    output: W,
    export_dir: PathBuf,
    printed: usize,
    interactive: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Create a console writing exports to `export_dir`.
    pub fn new(session: DraftSession, input: R, output: W, export_dir: impl Into<PathBuf>) -> Self {
        Self { session, input, output, export_dir: export_dir.into(), printed: 0, interactive: true }
    }

    /// Show or hide the input prompt.
    pub fn with_prompt(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// The session being driven.
    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    /// Run until `:quit` or end of input.
    ///
    /// With `template`, the session opens on that template first.
    pub async fn run(&mut self, template: Option<&str>) -> Result<()> {
        if let Some(template_id) = template {
            let outcome = self.session.open_template(template_id).await;
            self.report(outcome)?;
        } else {
            self.flush()?;
        }

        while let Some(line) = self.read_line("> ")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let flow = if line.starts_with(ACTION_PREFIX) {
                match Action::parse(line) {
                    Ok(action) => self.perform(action).await?,
                    Err(message) => {
                        writeln!(self.output, "! {message}")?;
                        Flow::Continue
                    }
                }
            } else {
                let outcome = self.session.send(line).await;
                self.report(outcome)?;
                Flow::Continue
            };

            if flow == Flow::Quit {
                break;
            }
        }

        tracing::debug!(messages = self.printed, "Console closed");
        Ok(())
    }

    async fn perform(&mut self, action: Action) -> Result<Flow> {
        tracing::debug!(?action, "Console action");
        match action {
            Action::Use => {
                let outcome = self.session.confirm_template();
                self.report(outcome)?;
            }
            Action::Alternative(n) => {
                let picked = self
                    .session
                    .draft()
                    .and_then(|d| d.alternatives.get(n - 1).map(|a| a.template_id.clone()));
                match picked {
                    Some(template_id) => {
                        let outcome = self.session.select_alternative(&template_id).await;
                        self.report(outcome)?;
                    }
                    None => writeln!(self.output, "! No alternative #{n}")?,
                }
            }
            Action::Answer { loose } => self.answer(!loose).await?,
            Action::Edit => {
                let outcome = self.session.edit_variables().await.map(|()| self.session.phase());
                self.report(outcome)?;
            }
            Action::Regenerate => {
                let outcome = self.session.regenerate().await.map(|_| Phase::DraftReady);
                self.report(outcome)?;
            }
            Action::Export(format) => match self.session.export(format).await {
                Ok(artifact) => {
                    self.flush()?;
                    match artifact.write_to(&self.export_dir) {
                        Ok(path) => {
                            tracing::info!(path = %path.display(), mime = artifact.mime, "Draft exported");
                            writeln!(self.output, "Saved {}", path.display())?;
                        }
                        Err(err) => {
                            tracing::warn!(dir = %self.export_dir.display(), error = %err, "Export write failed");
                            writeln!(self.output, "! Could not save {}: {err}", artifact.file_name)?;
                        }
                    }
                }
                Err(err) => self.report::<()>(Err(err))?,
            },
            Action::Import(n) => {
                let picked = self.session.web_results().get(n - 1).map(|r| r.id.clone());
                match picked {
                    Some(result_id) => {
                        let outcome = self.session.bootstrap(&result_id).await;
                        self.report(outcome)?;
                    }
                    None => writeln!(self.output, "! No web result #{n}")?,
                }
            }
            Action::Show => match self.session.draft().and_then(|d| d.draft_markdown) {
                Some(markdown) => writeln!(self.output, "{markdown}\n")?,
                None => writeln!(self.output, "! The draft has not been generated yet")?,
            },
            Action::Status => self.print_status()?,
            Action::Help => writeln!(self.output, "{HELP}\n")?,
            Action::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Walk the question form, then submit it.
    async fn answer(&mut self, strict: bool) -> Result<()> {
        let Some(mut form) = self.session.answer_form() else {
            writeln!(self.output, "! {}", SessionError::NotAnswering)?;
            return Ok(());
        };
        form.set_strict_replace(strict);

        if !self.fill(&mut form)? {
            return Ok(());
        }
        let outcome = self.session.submit_form(form).await.map(|_| Phase::DraftReady);
        self.report(outcome)
    }

    /// Prompt for every question. Returns `false` if input ran out.
    fn fill(&mut self, form: &mut AnswerForm) -> Result<bool> {
        let questions = form.questions().to_vec();
        for question in &questions {
            let mut prompt = question.question_text.clone();
            if let Some(hint) = &question.format_hint {
                prompt.push_str(&format!(" ({hint})"));
            }
            if let Some(current) = form.value(&question.variable_key) {
                prompt.push_str(&format!(" [{current}]"));
            }
            prompt.push_str(": ");

            let Some(line) = self.read_line(&prompt)? else {
                return Ok(false);
            };
            let line = line.trim();
            if !line.is_empty() {
                form.set(question.variable_key.clone(), line);
            }
        }
        Ok(true)
    }

    /// Print the outcome of a session operation.
    fn report<T>(&mut self, outcome: SessionResult<T>) -> Result<()> {
        self.flush()?;
        match outcome {
            Ok(_) => self.print_view()?,
            Err(err) if err.is_reported() => {}
            Err(err) => writeln!(self.output, "! {err}")?,
        }
        Ok(())
    }

    /// Print new transcript messages and pending notices.
    fn flush(&mut self) -> Result<()> {
        for message in self.session.messages_since(self.printed) {
            self.printed += 1;
            if message.role == Role::Assistant {
                writeln!(self.output, "{}\n", message.content)?;
            }
        }
        for notice in self.session.drain_notices() {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
            };
            writeln!(self.output, "[{tag}] {}: {}", notice.title, notice.description)?;
        }
        self.output.flush()?;
        Ok(())
    }

    /// Print what the current phase offers the user.
    fn print_view(&mut self) -> Result<()> {
        match self.session.phase() {
            Phase::Idle => {}
            Phase::WebSearching => {
                let results = self.session.web_results();
                for (i, result) in results.iter().enumerate() {
                    writeln!(self.output, "  {}. {} <{}>", i + 1, result.title, result.url)?;
                    if !result.snippet.is_empty() {
                        writeln!(self.output, "     {}", result.snippet)?;
                    }
                }
                if !results.is_empty() {
                    writeln!(self.output, "Use :import <n> to create a template from a result.\n")?;
                }
            }
            Phase::TemplateProposed => {
                if let Some(draft) = self.session.draft() {
                    writeln!(
                        self.output,
                        "Template: {} ({:.0}% match)\n{}",
                        draft.template_title,
                        draft.display_confidence() * 100.0,
                        draft.display_justification()
                    )?;
                    for (i, alt) in draft.alternatives.iter().enumerate() {
                        writeln!(self.output, "  {}. {}", i + 1, alt.title)?;
                    }
                    writeln!(self.output, "Use :use to continue, or :alt <n> to switch.\n")?;
                }
            }
            Phase::AnsweringQuestions => {
                if let Some(draft) = self.session.draft() {
                    for question in &draft.questions {
                        let value = draft.value_of(&question.variable_key).unwrap_or_default();
                        writeln!(self.output, "  - {} {value}", question.question_text)?;
                    }
                    writeln!(self.output, "Use :answer to fill in the form.\n")?;
                }
            }
            Phase::DraftReady => {
                if let Some(draft) = self.session.draft() {
                    writeln!(self.output, "--- Draft #{} ---", draft.draft_number)?;
                    writeln!(self.output, "{}", draft.draft_markdown.unwrap_or_default())?;
                    writeln!(self.output, "--- :regen, :edit or :export md|docx ---\n")?;
                }
            }
        }
        self.output.flush()?;
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let session = &self.session;
        writeln!(self.output, "phase: {:?}", session.phase())?;
        if let Some(draft) = session.draft() {
            writeln!(self.output, "template: {} ({})", draft.template_title, draft.template_id)?;
            writeln!(self.output, "instance: {}", draft.instance_id)?;
            writeln!(self.output, "draft number: {}", draft.draft_number)?;
        }
        if let Some(query) = session.last_query() {
            writeln!(self.output, "last query: {query}")?;
        }
        writeln!(
            self.output,
            "loading: {}, generating: {}, bootstrapping: {}",
            session.is_loading(),
            session.is_generating(),
            session.bootstrapping().as_deref().unwrap_or("-")
        )?;
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.interactive {
            write!(self.output, "{prompt}")?;
            self.output.flush()?;
        }
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
