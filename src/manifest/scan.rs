//! Filesystem scans behind the manifest statistics.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// File count and byte total for a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

/// Walks `dir` recursively and tallies regular files.
///
/// Paths listed in `exclude` are skipped. A missing `dir` yields zero; an
/// unreadable subdirectory is logged and skipped. Symlinks are not followed.
#[must_use]
pub fn scan_tree(dir: &Path, exclude: &[PathBuf]) -> TreeStats {
    let mut stats = TreeStats::default();
    if !dir.is_dir() {
        return stats;
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    path = %current.display(),
                    error = %error,
                    "Skipping unreadable directory while counting files"
                );
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && !exclude.contains(&path) {
                stats.files += 1;
                stats.bytes += entry.metadata().map_or(0, |m| m.len());
            }
        }
    }

    stats
}

/// Formats a byte count for humans: `0 B`, `512 B`, `1.5 KB`, `2.0 MB`, `1.1 GB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
