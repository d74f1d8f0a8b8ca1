//! Errors raised by the file source.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::document::DocumentError;

/// Failure to produce a current configuration document.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file was missing when a refresh check was due.
    #[error("configuration file ({}) not found", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("error reading configuration file ({})", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its content is malformed.
    #[error("error parsing configuration file ({})", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// No document has ever been loaded successfully.
    #[error("configuration file ({}) is not loaded", path.display())]
    NotLoaded { path: PathBuf },
}

impl SourceError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NotFound { .. } => "not_found",
            SourceError::Io { .. } => "io",
            SourceError::Parse { .. } => "parse",
            SourceError::NotLoaded { .. } => "not_loaded",
        }
    }
}
