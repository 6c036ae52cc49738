//! Error types for manifest aggregation and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building or writing the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A section was merged twice; the sections map is append-only.
    #[error("section '{section}' is already present in the manifest")]
    DuplicateSection {
        /// The repeated section name.
        section: String,
    },

    /// JSON serialization error (shouldn't occur for well-formed structs).
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O error writing or moving the manifest file.
    #[error("I/O error writing manifest {path}: {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates a duplicate-section error.
    pub fn duplicate_section(section: impl Into<String>) -> Self {
        Self::DuplicateSection {
            section: section.into(),
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
