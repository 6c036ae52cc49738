//! Corpus manifest: run identity plus per-section statistics.
//!
//! The manifest is written once per run to `<root>/manifest.json`:
//!
//! ```json
//! {
//!   "name": "demo",
//!   "created": "2026-10-19T08:30:00Z",
//!   "statistics": {
//!     "total_files": 1,
//!     "sections": { "a": { "files": 1, "size": "12 B" } }
//!   }
//! }
//! ```
//!
//! `total_files` comes from one scan of the whole corpus root and the
//! per-section numbers from separate scans of each section directory. Files
//! outside any declared section count towards `total_files` only, so the two
//! are not guaranteed to add up.

mod error;
mod scan;

pub use error::ManifestError;
pub use scan::{TreeStats, format_size, scan_tree};

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::{debug, info, instrument};

use crate::config::CorpusSpec;
use crate::provision::CorpusLayout;

/// Suffix of the in-progress manifest next to the canonical path.
const TEMP_SUFFIX: &str = ".tmp";

/// Persisted run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub name: String,
    /// RFC 3339 UTC timestamp of manifest generation.
    pub created: String,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    /// Regular files under the corpus root, manifest excluded.
    pub total_files: u64,
    pub sections: SectionTable,
}

/// Statistics for one section subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionStats {
    pub files: u64,
    /// Human-readable total size.
    pub size: String,
    #[serde(skip)]
    pub bytes: u64,
}

impl From<TreeStats> for SectionStats {
    fn from(stats: TreeStats) -> Self {
        Self {
            files: stats.files,
            size: format_size(stats.bytes),
            bytes: stats.bytes,
        }
    }
}

/// Section statistics in merge order; serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable(Vec<(String, SectionStats)>);

impl SectionTable {
    #[must_use]
    pub fn get(&self, section: &str) -> Option<&SectionStats> {
        self.0
            .iter()
            .find_map(|(name, stats)| (name == section).then_some(stats))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionStats)> {
        self.0.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    /// Sum of per-section file counts.
    #[must_use]
    pub fn summed_files(&self) -> u64 {
        self.0.iter().map(|(_, stats)| stats.files).sum()
    }
}

impl Serialize for SectionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, stats) in &self.0 {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// Builds a manifest one section at a time.
///
/// The sections map is append-only: merging a name twice is an error rather
/// than an overwrite.
#[derive(Debug)]
pub struct ManifestBuilder {
    name: String,
    created: DateTime<Utc>,
    sections: SectionTable,
}

impl ManifestBuilder {
    /// Starts the base document.
    pub fn new(name: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created,
            sections: SectionTable::default(),
        }
    }

    /// Adds one section entry.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateSection`] if `section` was already merged.
    pub fn merge_section(
        &mut self,
        section: impl Into<String>,
        stats: SectionStats,
    ) -> Result<&mut Self, ManifestError> {
        let section = section.into();
        if self.sections.get(&section).is_some() {
            return Err(ManifestError::duplicate_section(section));
        }
        debug!(section = %section, files = stats.files, size = %stats.size, "Merged section statistics");
        self.sections.0.push((section, stats));
        Ok(self)
    }

    /// Completes the manifest with the whole-tree file count.
    #[must_use]
    pub fn finish(self, total_files: u64) -> Manifest {
        Manifest {
            name: self.name,
            created: self.created.to_rfc3339_opts(SecondsFormat::Secs, true),
            statistics: Statistics {
                total_files,
                sections: self.sections,
            },
        }
    }
}

/// Scans the corpus and builds its manifest.
///
/// Every section declared in `spec` gets an entry, including sections whose
/// directory is missing (zero files, `0 B`).
///
/// # Errors
///
/// Returns [`ManifestError::DuplicateSection`] if `spec` repeats a section name.
pub fn aggregate(
    layout: &CorpusLayout,
    spec: &CorpusSpec,
    created: DateTime<Utc>,
) -> Result<Manifest, ManifestError> {
    aggregate_including(layout, spec, &[], created)
}

/// Like [`aggregate`], with entries for `extra` top-level directories after
/// the declared sections. Names already declared are not repeated.
///
/// # Errors
///
/// Returns [`ManifestError::DuplicateSection`] if `spec` repeats a section name.
#[instrument(skip(layout, spec), fields(root = %layout.root().display()))]
pub fn aggregate_including(
    layout: &CorpusLayout,
    spec: &CorpusSpec,
    extra: &[&str],
    created: DateTime<Utc>,
) -> Result<Manifest, ManifestError> {
    let excluded = [layout.manifest_path(), temp_path(&layout.manifest_path())];
    let total = scan_tree(layout.root(), &excluded);

    let mut builder = ManifestBuilder::new(&spec.name, created);
    for section in &spec.sections {
        let stats = scan_tree(&layout.section_dir(&section.name), &[]);
        builder.merge_section(&section.name, stats.into())?;
    }
    for name in extra {
        if spec.sections.iter().any(|section| section.name == *name) {
            continue;
        }
        let stats = scan_tree(&layout.section_dir(name), &[]);
        builder.merge_section(*name, stats.into())?;
    }

    Ok(builder.finish(total.files))
}

/// Writes `manifest` to the layout's manifest path.
///
/// The document is written to `manifest.json.tmp` first and renamed into
/// place, so the canonical path only ever holds a complete manifest.
///
/// # Errors
///
/// Returns [`ManifestError`] on serialization or IO failure; the temporary
/// file is removed on a best-effort basis.
#[instrument(skip_all, fields(path = %layout.manifest_path().display()))]
pub fn write_manifest(layout: &CorpusLayout, manifest: &Manifest) -> Result<PathBuf, ManifestError> {
    let path = layout.manifest_path();
    write_json_atomically(&path, manifest)?;
    info!(path = %path.display(), "Manifest written");
    Ok(path)
}

/// Writes `value` as pretty JSON to `<path>.tmp`, syncs it and renames it
/// over `path`. The temporary file is removed on failure.
pub(crate) fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<(), ManifestError> {
    let temp = temp_path(path);

    if let Err(err) = write_json(&temp, value) {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(ManifestError::write(path, err));
    }
    Ok(())
}

fn write_json<T: Serialize>(temp: &Path, value: &T) -> Result<(), ManifestError> {
    let file = fs::File::create(temp).map_err(|e| ManifestError::write(temp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(|e| ManifestError::write(temp, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| ManifestError::write(temp, e.into_error()))?;
    file.sync_all().map_err(|e| ManifestError::write(temp, e))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}
