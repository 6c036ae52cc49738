//! Error types for reference expansion.

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;

/// Errors that stop an expansion pass.
///
/// Unreadable documents and failed downloads are not here; they are logged
/// and recorded per reference.
#[derive(Debug, Error)]
pub enum ExpandError {
    /// The expansion directory could not be created.
    #[error("cannot create expansion directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The expansion log could not be written.
    #[error("cannot write expansion log: {0}")]
    Log(#[source] ManifestError),
}

impl ExpandError {
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }
}
