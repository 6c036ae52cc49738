//! Reference detection in document text: DOIs, arXiv identifiers and links
//! to scholarly hosts.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::trace;
use url::Url;

use crate::fetch::sanitize_filename;

/// Regex pattern for bare DOIs: `10.XXXX/suffix`, nested registrants included.
/// The preceding-character check happens in code since `regex` has no lookbehind.
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]]+"#).expect("DOI regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for DOI URLs: `https://doi.org/10.XXXX/suffix` or `https://dx.doi.org/...`
#[allow(clippy::expect_used)]
static DOI_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:dx\.)?doi\.org/(10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]]+)"#)
        .expect("DOI URL regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for `DOI:` prefixed DOIs: `DOI: 10.XXXX/suffix`
#[allow(clippy::expect_used)]
static DOI_PREFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)doi:\s*(10\.\d{4,9}(?:\.\d+)*/[^\s<>"'\]]+)"#)
        .expect("DOI prefix regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for `arXiv:YYMM.NNNNN` identifiers; a version suffix is dropped.
#[allow(clippy::expect_used)]
static ARXIV_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv:\s*(\d{4}\.\d{4,5})(?:v\d+)?").expect("arXiv regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for arXiv abstract or PDF links.
#[allow(clippy::expect_used)]
static ARXIV_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:abs|pdf)/(\d{4}\.\d{4,5})(?:v\d+)?(?:\.pdf)?/?$")
        .expect("arXiv path regex is valid") // Static pattern, safe to panic
});

/// Regex pattern for http(s) URLs embedded in text.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

/// Host fragments that mark a link as a scholarly reference.
const SCHOLARLY_HOSTS: &[&str] = &["arxiv.org", "doi.org", "pubmed", "scholar.google"];

/// File name for links whose path has no usable final segment.
const FALLBACK_DOCUMENT_NAME: &str = "document.pdf";

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Doi,
    Arxiv,
    Url,
}

/// One reference found in a corpus document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// The DOI, the arXiv identifier or the normalized URL.
    pub value: String,
    /// Document the reference was found in.
    pub source: PathBuf,
}

impl Reference {
    fn new(kind: ReferenceKind, value: impl Into<String>, source: &Path) -> Self {
        Self {
            kind,
            value: value.into(),
            source: source.to_path_buf(),
        }
    }

    /// Identity used to drop repeated references. DOIs compare case-insensitively.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        match self.kind {
            ReferenceKind::Doi => format!("doi:{}", self.value.to_lowercase()),
            ReferenceKind::Arxiv => format!("arxiv:{}", self.value),
            ReferenceKind::Url => format!("url:{}", self.value),
        }
    }

    /// Where the document is fetched from.
    #[must_use]
    pub fn download_url(&self) -> String {
        match self.kind {
            ReferenceKind::Doi => format!("https://doi.org/{}", self.value),
            ReferenceKind::Arxiv => format!("https://arxiv.org/pdf/{}.pdf", self.value),
            ReferenceKind::Url => self.value.clone(),
        }
    }

    /// Name of the downloaded file inside the expansion directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self.kind {
            ReferenceKind::Doi => format!("{}.pdf", sanitize_filename(&self.value.replace('/', "_"))),
            ReferenceKind::Arxiv => format!("{}.pdf", self.value),
            ReferenceKind::Url => url_file_name(&self.value),
        }
    }
}

/// Finds every reference in `text`, in the order the patterns are tried.
///
/// DOI URLs, `DOI:` prefixes and bare DOIs come first, then arXiv
/// identifiers, then links to scholarly hosts. A span claimed by an earlier
/// pattern is not matched again, so `https://doi.org/10.1234/x` yields one
/// DOI rather than a DOI plus a URL. Repeats are kept; deduplication is the
/// caller's job.
#[tracing::instrument(skip_all, fields(source = %source.display(), text_len = text.len()))]
#[must_use]
pub fn extract_references(text: &str, source: &Path) -> Vec<Reference> {
    let mut found = Vec::new();
    let mut seen_ranges: Vec<(usize, usize)> = Vec::new();

    for cap in DOI_URL_PATTERN.captures_iter(text) {
        if let (Some(full), Some(doi)) = (cap.get(0), cap.get(1)) {
            seen_ranges.push((full.start(), full.end()));
            push_doi(doi.as_str(), source, &mut found);
        }
    }

    for cap in DOI_PREFIX_PATTERN.captures_iter(text) {
        if let (Some(full), Some(doi)) = (cap.get(0), cap.get(1)) {
            if overlaps(&seen_ranges, full.start(), full.end()) {
                continue;
            }
            seen_ranges.push((full.start(), full.end()));
            push_doi(doi.as_str(), source, &mut found);
        }
    }

    for m in DOI_PATTERN.find_iter(text) {
        if overlaps(&seen_ranges, m.start(), m.end()) {
            continue;
        }
        // Reject IP-like and version-like matches (192.10.1234/24, v10.1234/rc1)
        if m.start() > 0 {
            let prev_byte = text.as_bytes()[m.start() - 1];
            if prev_byte.is_ascii_alphanumeric() || prev_byte == b'.' {
                continue;
            }
        }
        seen_ranges.push((m.start(), m.end()));
        push_doi(m.as_str(), source, &mut found);
    }

    for cap in ARXIV_PATTERN.captures_iter(text) {
        if let (Some(full), Some(id)) = (cap.get(0), cap.get(1)) {
            if overlaps(&seen_ranges, full.start(), full.end()) {
                continue;
            }
            seen_ranges.push((full.start(), full.end()));
            trace!(arxiv = %id.as_str(), "found arXiv candidate");
            found.push(Reference::new(ReferenceKind::Arxiv, id.as_str(), source));
        }
    }

    for m in URL_PATTERN.find_iter(text) {
        if overlaps(&seen_ranges, m.start(), m.end()) {
            continue;
        }
        let cleaned = clean_url_trailing(m.as_str());
        if let Some(reference) = scholarly_link(cleaned, source) {
            trace!(url = %cleaned, "found scholarly link");
            found.push(reference);
        }
    }

    found
}

fn overlaps(seen: &[(usize, usize)], start: usize, end: usize) -> bool {
    seen.iter().any(|&(s, e)| start < e && end > s)
}

fn push_doi(candidate: &str, source: &Path, found: &mut Vec<Reference>) {
    let cleaned = clean_url_trailing(candidate);
    let has_suffix = cleaned
        .split_once('/')
        .is_some_and(|(_, suffix)| !suffix.is_empty());
    if has_suffix {
        trace!(doi = %cleaned, "found DOI candidate");
        found.push(Reference::new(ReferenceKind::Doi, cleaned, source));
    } else {
        trace!(doi = %candidate, "DOI candidate has no suffix after cleanup");
    }
}

/// Keeps links to scholarly hosts; arXiv abstract and PDF links become arXiv
/// references so they share a key with `arXiv:` mentions.
fn scholarly_link(raw: &str, source: &Path) -> Option<Reference> {
    let parsed = Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !SCHOLARLY_HOSTS.iter().any(|fragment| host.contains(fragment)) {
        return None;
    }
    if host.ends_with("arxiv.org") {
        if let Some(cap) = ARXIV_PATH_PATTERN.captures(parsed.path()) {
            return Some(Reference::new(ReferenceKind::Arxiv, &cap[1], source));
        }
    }
    Some(Reference::new(ReferenceKind::Url, parsed.as_str(), source))
}

/// Strips sentence punctuation and unbalanced closing brackets from the end
/// of a match. A trailing `.ext` of 1-5 alphanumerics is kept.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                if last == '.' {
                    if let Some(dot_pos) = result.rfind('.') {
                        let after_dot = &result[dot_pos + 1..];
                        if (1..=5).contains(&after_dot.len())
                            && after_dot.chars().all(|c| c.is_ascii_alphanumeric())
                        {
                            break;
                        }
                    }
                }
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

fn url_file_name(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .rev()
                .find(|segment| !segment.is_empty())
                .map(|segment| {
                    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |d| d.into_owned())
                })
        })
        .map_or_else(|| FALLBACK_DOCUMENT_NAME.to_string(), |name| sanitize_filename(&name))
}
