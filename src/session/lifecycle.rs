//! Draft lifecycle: what can be done with a draft once it exists.

use std::io;
use std::path::{Path, PathBuf};

use super::store::Gate;
use super::{DraftSession, NoticeLevel, SessionError, SessionResult};

/// MIME type of a DOCX document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The draft markdown as-is
    Markdown,
    /// Word document rendered by the engine
    Docx,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Docx => "docx",
        }
    }

    /// MIME type of the artifact.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown",
            Self::Docx => DOCX_MIME,
        }
    }

    /// Artifact file name for draft `number`.
    pub fn file_name(self, number: u32) -> String {
        format!("draft_{number}.{}", self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "docx" | "word" => Ok(Self::Docx),
            other => Err(format!("Unknown export format: {other} (expected md or docx)")),
        }
    }
}

/// A downloadable draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// MIME type
    pub mime: &'static str,
    /// File contents
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    fn new(format: ExportFormat, number: u32, bytes: Vec<u8>) -> Self {
        Self { file_name: format.file_name(number), mime: format.mime(), bytes }
    }

    /// Write the artifact into `dir` under its file name.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

impl DraftSession {
    /// Reopen the question form with the engine's current values.
    ///
    /// The engine is authoritative: its values replace whatever was last
    /// submitted, and the rendered draft is dropped until the next finalize.
    /// Only a generated draft can be edited.
    pub async fn edit_variables(&self) -> SessionResult<()> {
        let instance_id = self.with_state(|s| {
            let draft = s.draft.as_ref().ok_or(SessionError::NoActiveDraft)?;
            if !draft.is_drafted() {
                return Err(SessionError::NotDrafted);
            }
            Ok(draft.instance_id.clone())
        })?;

        tracing::debug!(%instance_id, "Fetching variables for edit");
        match self.engine.edit_draft_variables(&instance_id).await {
            Ok(variables) => self.with_state(|s| {
                let Some(draft) = s.draft_for(&instance_id) else {
                    tracing::warn!(%instance_id, "Draft replaced while fetching variables, result dropped");
                    return Err(SessionError::Superseded);
                };
                draft.questions = variables.questions;
                draft.pre_filled = variables.pre_filled;
                draft.draft_markdown = None;
                s.confirmed = true;
                s.say("Let's edit the variables. You can change any of the values below:");
                Ok(())
            }),
            Err(err) => {
                tracing::warn!(%instance_id, error = %err, "Edit failed");
                self.with_state(|s| {
                    s.say(format!("Sorry, I couldn't load the variables for editing: {err}"));
                    s.notify(NoticeLevel::Error, "Edit failed", err.to_string());
                });
                Err(err.into())
            }
        }
    }

    /// Render the draft again and return the new draft number.
    ///
    /// The number goes up by one per successful call, whatever the engine
    /// reports.
    pub async fn regenerate(&self) -> SessionResult<u32> {
        let instance_id = self.with_state(|s| {
            let draft = s.draft.as_ref().ok_or(SessionError::NoActiveDraft)?;
            if !draft.is_drafted() {
                return Err(SessionError::NotDrafted);
            }
            Ok(draft.instance_id.clone())
        })?;

        let Some(_generating) = self.enter(Gate::Generating) else {
            return Err(SessionError::Generating);
        };

        tracing::debug!(%instance_id, "Regenerating draft");
        match self.engine.regenerate_draft(&instance_id).await {
            Ok(regenerated) => self.with_state(|s| {
                let Some(draft) = s.draft_for(&instance_id) else {
                    tracing::warn!(%instance_id, "Draft replaced while regenerating, result dropped");
                    return Err(SessionError::Superseded);
                };
                // An edit reopened the form in the meantime
                if !draft.is_drafted() {
                    tracing::warn!(%instance_id, "Draft reopened for editing while regenerating, result dropped");
                    return Err(SessionError::Superseded);
                }
                if let Some(reported) = regenerated.draft_number {
                    tracing::trace!(reported, "Ignoring engine draft number");
                }
                draft.draft_markdown = Some(regenerated.draft_md);
                draft.draft_number += 1;
                let number = draft.draft_number;

                tracing::info!(%instance_id, draft_number = number, "Draft regenerated");
                s.notify(NoticeLevel::Success, "Draft regenerated", format!("Draft #{number} is ready"));
                Ok(number)
            }),
            Err(err) => {
                tracing::warn!(%instance_id, error = %err, "Regenerate failed");
                self.with_state(|s| {
                    s.say(format!("Sorry, I couldn't regenerate the draft: {err}"));
                    s.notify(NoticeLevel::Error, "Regeneration failed", err.to_string());
                });
                Err(err.into())
            }
        }
    }

    /// Export the draft in `format`.
    pub async fn export(&self, format: ExportFormat) -> SessionResult<ExportArtifact> {
        match format {
            ExportFormat::Markdown => self.export_markdown(),
            ExportFormat::Docx => self.export_docx().await,
        }
    }

    /// The draft markdown as a file. Local only.
    pub fn export_markdown(&self) -> SessionResult<ExportArtifact> {
        self.with_state(|s| {
            let draft = s.draft.as_ref().ok_or(SessionError::NoActiveDraft)?;
            let markdown = draft.draft_markdown.as_ref().ok_or(SessionError::NotDrafted)?;
            Ok(ExportArtifact::new(
                ExportFormat::Markdown,
                draft.draft_number,
                markdown.clone().into_bytes(),
            ))
        })
    }

    /// The draft as a DOCX document rendered by the engine.
    pub async fn export_docx(&self) -> SessionResult<ExportArtifact> {
        let (instance_id, number) = self.with_state(|s| {
            let draft = s.draft.as_ref().ok_or(SessionError::NoActiveDraft)?;
            if !draft.is_drafted() {
                return Err(SessionError::NotDrafted);
            }
            Ok((draft.instance_id.clone(), draft.draft_number))
        })?;

        match self.engine.download_docx(&instance_id).await {
            Ok(bytes) => {
                tracing::info!(%instance_id, size = bytes.len(), "DOCX downloaded");
                Ok(ExportArtifact::new(ExportFormat::Docx, number, bytes))
            }
            Err(err) => {
                tracing::warn!(%instance_id, error = %err, "DOCX download failed");
                self.with_state(|s| {
                    s.say(format!("Sorry, I couldn't download the document: {err}"));
                    s.notify(NoticeLevel::Error, "Download failed", err.to_string());
                });
                Err(err.into())
            }
        }
    }
}
