//! Destination file naming for fetched resources.
//!
//! The destination name is the URL's final path segment. Two URLs that end
//! in the same segment map to the same file, and the later fetch replaces
//! the earlier one.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use url::Url;

use super::constants::{FALLBACK_FILE_NAME, PART_SUFFIX};

/// Derives the destination file name for `url`.
///
/// Order of preference:
/// 1. last non-empty path segment, percent-decoded
/// 2. URL host
/// 3. `download`
///
/// Strings that do not parse as URLs fall back to the text after the last
/// `/`, so a bad URL still gets a stable name for reporting.
#[must_use]
pub fn destination_file_name(url: &str) -> String {
    let candidate = match Url::parse(url) {
        Ok(parsed) => last_segment(&parsed).or_else(|| parsed.host_str().map(str::to_string)),
        Err(_) => raw_last_segment(url),
    };

    candidate
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.trim_matches('_').is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn last_segment(url: &Url) -> Option<String> {
    let last = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(last).map_or_else(
        |e| {
            debug!(segment = %last, error = %e, "URL decoding failed, using raw segment");
            last.to_string()
        },
        std::borrow::Cow::into_owned,
    );
    Some(decoded)
}

fn raw_last_segment(raw: &str) -> Option<String> {
    let without_suffix = raw.split(['?', '#']).next().unwrap_or(raw);
    without_suffix
        .rsplit('/')
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

/// In-progress path for a destination: `.<name>.<attempt>.part` in the same
/// directory, so the final rename never crosses filesystems.
pub(crate) fn part_path(destination: &Path, attempt: usize) -> PathBuf {
    let name = destination
        .file_name()
        .map_or_else(|| FALLBACK_FILE_NAME.into(), |n| n.to_string_lossy());
    let part_name = format!(".{name}.{attempt}{PART_SUFFIX}");
    destination.with_file_name(part_name)
}
