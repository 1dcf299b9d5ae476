//! Error taxonomy for a language-adding run.
//!
//! A missing generator is not an error: it surfaces as
//! [`Outcome::GeneratorMissing`](crate::workflow::Outcome). Everything here is fatal.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::choice::ChoiceError;

#[derive(Debug, Error)]
pub enum UpdateError {
    /// The grammar source no longer has the expected enumerated-choice shape.
    #[error("{}: {source}", path.display())]
    StructuralMismatch {
        path: PathBuf,
        #[source]
        source: ChoiceError,
    },

    /// The identifier cannot be written into the choice block and read back.
    #[error("invalid language name {name:?}: {reason}")]
    InvalidLanguage { name: String, reason: &'static str },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An artifact exists but is not valid JSON.
    #[error("{}: malformed JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but without the rule or list the reconciliation edits.
    #[error("{}: {detail}", path.display())]
    ArtifactShape { path: PathBuf, detail: String },

    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed ({status})\n{output}")]
    ToolFailed {
        command: String,
        status: String,
        output: String,
    },

    /// Writing operator narration failed (closed stdout, full disk, ...).
    #[error("could not write progress output: {0}")]
    Narration(#[from] io::Error),
}

impl UpdateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        UpdateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = UpdateError> = std::result::Result<T, E>;
