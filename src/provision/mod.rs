//! Corpus directory layout and idempotent provisioning.
//!
//! The layout is always `<root>/<section>/<subsection>`, with the manifest
//! at `<root>/manifest.json`. [`CorpusLayout`] is the single place that
//! knows how these paths are built.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::CorpusSpec;

/// Well-known manifest file name inside the corpus root.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Top-level directory for references downloaded by expansion.
pub const EXPANDED_SECTION_NAME: &str = "EXPANDED_REFERENCES";

/// Expansion report file name inside the corpus root.
pub const EXPANSION_LOG_FILE_NAME: &str = "expansion_log.json";

/// Errors raised while creating corpus directories.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Directory creation failed.
    #[error("cannot create directory {path}: {source}")]
    Io {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    /// Creates an IO error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Resolved filesystem layout of one corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    root: PathBuf,
}

impl CorpusLayout {
    /// Uses `root` as the corpus root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Places the corpus for `spec` under `base_dir` as `<name>_CORPUS`.
    #[must_use]
    pub fn for_spec(base_dir: &Path, spec: &CorpusSpec) -> Self {
        Self::new(base_dir.join(spec.corpus_dir_name()))
    }

    /// Corpus root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<section>`.
    #[must_use]
    pub fn section_dir(&self, section: &str) -> PathBuf {
        self.root.join(section)
    }

    /// `<root>/<section>/<subsection>`, where fetched files land.
    #[must_use]
    pub fn subsection_dir(&self, section: &str, subsection: &str) -> PathBuf {
        self.root.join(section).join(subsection)
    }

    /// Canonical manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Directory receiving references found by expansion.
    #[must_use]
    pub fn expanded_dir(&self) -> PathBuf {
        self.root.join(EXPANDED_SECTION_NAME)
    }

    /// Report written by an expansion pass.
    #[must_use]
    pub fn expansion_log_path(&self) -> PathBuf {
        self.root.join(EXPANSION_LOG_FILE_NAME)
    }
}

/// One subsection directory that could not be created.
#[derive(Debug)]
pub struct ProvisionFailure {
    /// Section the subsection belongs to.
    pub section: String,
    /// Subsection whose directory is missing.
    pub subsection: String,
    /// Why creation failed.
    pub error: ProvisionError,
}

/// Result of a provisioning pass.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    /// Directories created by this pass.
    pub created: Vec<PathBuf>,
    /// Directories that already existed.
    pub existing: Vec<PathBuf>,
    /// Subsections whose directory could not be created.
    pub failed: Vec<ProvisionFailure>,
}

impl ProvisionReport {
    /// Number of subsection directories present after the pass.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.created.len() + self.existing.len()
    }

    /// True when every subsection directory is in place.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates the corpus root and one directory per (section, subsection) pair.
///
/// Re-running on an existing corpus is a no-op. A subsection that cannot be
/// created is recorded in the report and does not stop the remaining ones.
///
/// # Errors
///
/// Returns [`ProvisionError`] only when the corpus root itself cannot be
/// created; nothing else in the run can succeed without it.
#[instrument(skip(spec), fields(root = %layout.root().display()))]
pub fn provision(layout: &CorpusLayout, spec: &CorpusSpec) -> Result<ProvisionReport, ProvisionError> {
    if !layout.root().is_dir() {
        fs::create_dir_all(layout.root()).map_err(|e| ProvisionError::io(layout.root(), e))?;
        info!(dir = %layout.root().display(), "Created corpus root");
    }

    let mut report = ProvisionReport::default();
    for section in &spec.sections {
        for subsection in &section.subsections {
            let dir = layout.subsection_dir(&section.name, &subsection.name);
            match ensure_dir(&dir) {
                Ok(true) => {
                    info!(dir = %dir.display(), "Created directory");
                    report.created.push(dir);
                }
                Ok(false) => {
                    debug!(dir = %dir.display(), "Directory already exists");
                    report.existing.push(dir);
                }
                Err(error) => {
                    warn!(
                        section = %section.name,
                        subsection = %subsection.name,
                        error = %error,
                        "Failed to create directory, skipping"
                    );
                    report.failed.push(ProvisionFailure {
                        section: section.name.clone(),
                        subsection: subsection.name.clone(),
                        error,
                    });
                }
            }
        }
    }

    Ok(report)
}

/// Returns `Ok(true)` if the directory was created, `Ok(false)` if present.
fn ensure_dir(dir: &Path) -> Result<bool, ProvisionError> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))?;
    Ok(true)
}
