use thiserror::Error;

use crate::types::NoteId;

pub type UpdateResult<T> = Result<T, UpdateError>;

/// Everything the note workflow can report. None of these are fatal to the
/// process; the shell shows them as notices and keeps running.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("no update at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("update {0} no longer exists")]
    NoteNotFound(NoteId),

    #[error("update content is empty")]
    EmptyContent,

    #[error("add your OpenAI API key in settings first")]
    MissingCredential,

    #[error("there are no updates to summarize")]
    EmptyInput,

    #[error("a summary is already being generated")]
    SummaryInProgress,

    #[error("could not save: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("summary generation failed: {0}")]
    Generation(String),
}

impl UpdateError {
    /// The in-memory state is still good; only durability is in question.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    /// The user should be sent to the settings form.
    pub fn needs_settings(&self) -> bool {
        matches!(self, Self::MissingCredential)
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(e: reqwest::Error) -> Self {
        Self::Generation(e.to_string())
    }
}
