//! Reference expansion: grow a built corpus with the papers it cites.
//!
//! After the declared resources are fetched, text documents in the corpus
//! sections are scanned for references (see [`extract_references`]). Unique
//! references are downloaded one at a time into
//! `<root>/EXPANDED_REFERENCES/` until `max_downloads` are in place, and the
//! pass is recorded in `<root>/expansion_log.json`.
//!
//! # Features
//!
//! - DOI, arXiv and scholarly-link detection in `.txt` and `.md` documents
//! - Deduplication by DOI (case-insensitive), arXiv identifier or URL
//! - Targets already on disk are not downloaded again and count toward the limit
//! - Single attempt per reference through the same [`Fetcher`] as the run

mod error;
mod extract;

pub use error::ExpandError;
pub use extract::{Reference, ReferenceKind, extract_references};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::CorpusSpec;
use crate::fetch::{FetchStatus, Fetcher, attempt_fetch};
use crate::manifest::write_json_atomically;
use crate::provision::{CorpusLayout, EXPANDED_SECTION_NAME};

/// Default cap on references placed in the expansion directory.
pub const DEFAULT_MAX_DOWNLOADS: usize = 50;

/// Document extensions scanned when none are configured.
pub const DEFAULT_FILE_TYPES: &[&str] = &[".txt", ".md"];

/// Settings for one expansion pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandOptions {
    /// Stop once this many references are in place.
    pub max_downloads: usize,
    /// Sections to scan; empty means every declared section.
    #[serde(rename = "target_sections")]
    pub sections: Vec<String>,
    /// Extensions of documents to scan, e.g. `.md`.
    pub file_types: Vec<String>,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            sections: Vec::new(),
            file_types: DEFAULT_FILE_TYPES.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

impl ExpandOptions {
    fn wants_section(&self, name: &str) -> bool {
        name != EXPANDED_SECTION_NAME && (self.sections.is_empty() || self.sections.iter().any(|s| s == name))
    }

    /// Extension match is case-insensitive and tolerates a missing leading dot.
    fn wants_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.file_types
            .iter()
            .any(|t| t.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// What happened to one unique reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReferenceStatus {
    Downloaded { bytes: u64 },
    /// The target file was already there, e.g. from an earlier pass.
    AlreadyPresent,
    Failed { reason: String },
    /// The download limit was reached first.
    NotAttempted,
}

/// One unique reference and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedReference {
    pub kind: ReferenceKind,
    pub value: String,
    pub url: String,
    /// First document the reference was seen in.
    pub source: PathBuf,
    pub file_name: String,
    #[serde(flatten)]
    pub status: ReferenceStatus,
}

/// Summary of an expansion pass, persisted as `expansion_log.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpansionReport {
    /// RFC 3339 UTC timestamps.
    pub start_time: String,
    pub end_time: String,
    /// Seconds.
    pub duration: f64,
    pub documents_processed: usize,
    /// References found across all documents, repeats included.
    pub references_found: usize,
    pub unique_references: usize,
    pub references_downloaded: usize,
    pub already_present: usize,
    pub failed_downloads: usize,
    pub skipped_duplicates: usize,
    pub expansion_config: ExpandOptions,
    pub references: Vec<ExpandedReference>,
    #[serde(skip)]
    pub log_path: PathBuf,
}

/// Scans the corpus for references and downloads them.
///
/// Documents that cannot be read are logged and skipped. Each reference gets
/// at most one attempt; a failure is recorded and does not count toward
/// `max_downloads`.
///
/// # Errors
///
/// Returns [`ExpandError`] if the expansion directory cannot be created or
/// the log cannot be written.
#[instrument(skip_all, fields(root = %layout.root().display(), max = options.max_downloads))]
pub async fn expand(
    fetcher: &dyn Fetcher,
    layout: &CorpusLayout,
    spec: &CorpusSpec,
    options: &ExpandOptions,
) -> Result<ExpansionReport, ExpandError> {
    let started = Utc::now();

    for wanted in &options.sections {
        if !spec.sections.iter().any(|s| &s.name == wanted) {
            warn!(section = %wanted, "Expansion section is not declared in the corpus, ignoring");
        }
    }

    let documents: Vec<PathBuf> = spec
        .sections
        .iter()
        .filter(|section| options.wants_section(&section.name))
        .flat_map(|section| list_documents(&layout.section_dir(&section.name), options))
        .collect();
    info!(documents = documents.len(), "Scanning documents for references");

    let mut documents_processed = 0;
    let mut references_found = 0;
    let mut unique = Vec::new();
    let mut seen = HashSet::new();
    for document in &documents {
        let bytes = match tokio::fs::read(document).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(path = %document.display(), error = %error, "Skipping unreadable document");
                continue;
            }
        };
        documents_processed += 1;
        let found = extract_references(&String::from_utf8_lossy(&bytes), document);
        debug!(path = %document.display(), references = found.len(), "Document scanned");
        references_found += found.len();
        unique.extend(found.into_iter().filter(|r| seen.insert(r.dedupe_key())));
    }
    let skipped_duplicates = references_found - unique.len();
    info!(found = references_found, unique = unique.len(), "References collected");

    let dir = layout.expanded_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ExpandError::create_dir(&dir, e))?;

    let mut references = Vec::with_capacity(unique.len());
    let mut in_place = 0;
    for reference in unique {
        let url = reference.download_url();
        let file_name = reference.file_name();
        let destination = dir.join(&file_name);

        let status = if in_place >= options.max_downloads {
            ReferenceStatus::NotAttempted
        } else if is_populated(&destination).await {
            debug!(path = %destination.display(), "Reference already present");
            ReferenceStatus::AlreadyPresent
        } else {
            match attempt_fetch(fetcher, &url, &destination).await {
                FetchStatus::Fetched { bytes } => ReferenceStatus::Downloaded { bytes },
                FetchStatus::Failed { reason } => ReferenceStatus::Failed { reason },
            }
        };
        if matches!(status, ReferenceStatus::Downloaded { .. } | ReferenceStatus::AlreadyPresent) {
            in_place += 1;
            if in_place == options.max_downloads {
                info!(limit = options.max_downloads, "Reached download limit");
            }
        }

        references.push(ExpandedReference {
            kind: reference.kind,
            value: reference.value,
            url,
            source: reference.source,
            file_name,
            status,
        });
    }

    let report = finish_report(
        started,
        Utc::now(),
        documents_processed,
        references_found,
        skipped_duplicates,
        options,
        references,
        layout.expansion_log_path(),
    );
    write_json_atomically(&report.log_path, &report).map_err(ExpandError::Log)?;

    info!(
        documents = report.documents_processed,
        found = report.references_found,
        downloaded = report.references_downloaded,
        present = report.already_present,
        failed = report.failed_downloads,
        "Expansion complete"
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments, clippy::cast_precision_loss)]
fn finish_report(
    started: DateTime<Utc>,
    ended: DateTime<Utc>,
    documents_processed: usize,
    references_found: usize,
    skipped_duplicates: usize,
    options: &ExpandOptions,
    references: Vec<ExpandedReference>,
    log_path: PathBuf,
) -> ExpansionReport {
    let count = |pred: fn(&ReferenceStatus) -> bool| references.iter().filter(|r| pred(&r.status)).count();
    ExpansionReport {
        start_time: started.to_rfc3339_opts(SecondsFormat::Secs, true),
        end_time: ended.to_rfc3339_opts(SecondsFormat::Secs, true),
        duration: (ended - started).num_milliseconds().max(0) as f64 / 1000.0,
        documents_processed,
        references_found,
        unique_references: references.len(),
        references_downloaded: count(|s| matches!(s, ReferenceStatus::Downloaded { .. })),
        already_present: count(|s| matches!(s, ReferenceStatus::AlreadyPresent)),
        failed_downloads: count(|s| matches!(s, ReferenceStatus::Failed { .. })),
        skipped_duplicates,
        expansion_config: options.clone(),
        references,
        log_path,
    }
}

/// Documents under `dir` with a wanted extension, sorted by path.
///
/// Hidden entries (such as in-progress `.part` files) are skipped and
/// symlinks are not followed.
fn list_documents(dir: &Path, options: &ExpandOptions) -> Vec<PathBuf> {
    let mut documents = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && options.wants_file(&path) {
                documents.push(path);
            }
        }
    }
    documents.sort();
    documents
}

async fn is_populated(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}
