use std::path::PathBuf;

use thiserror::Error;

use crate::codec::EncodeError;
use crate::rename::ValidationError;

/// Failures reported back to whoever issued a session command.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Save failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Save failed: cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Delete failed: {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot prepare folder {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The current file has no decoded pixels or no crop to cut.
    #[error("Nothing to crop in {0}")]
    NoCrop(PathBuf),

    #[error("No image is loaded")]
    NoCurrent,

    #[error("All images processed")]
    Finished,
}
