//! Batch fetching: one attempt per declared URL, failures isolated per item.
//!
//! # Concurrency Model
//!
//! - `concurrency == 1` runs attempts strictly one after another in
//!   declaration order
//! - larger values keep up to that many attempts in flight on a buffered
//!   stream; outcomes are still returned in declaration order
//! - [`fetch_all`] returns only after every attempt has finished, so
//!   aggregation never observes an in-flight fetch

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info, instrument, warn};

use super::Fetcher;
use super::constants::MAX_CONCURRENCY;
use super::filename::destination_file_name;
use crate::config::CorpusSpec;
use crate::provision::CorpusLayout;

/// Result of one retrieval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Destination exists and is non-empty.
    Fetched {
        /// Bytes written by the attempt.
        bytes: u64,
    },
    /// The attempt failed; `reason` is the rendered error.
    Failed {
        reason: String,
    },
}

/// Outcome of fetching one (section, subsection, url) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub section: String,
    pub subsection: String,
    /// Original URL, for traceability.
    pub url: String,
    /// Destination file name derived from the URL.
    pub file_name: String,
    /// Full destination path.
    pub destination: PathBuf,
    pub status: FetchStatus,
}

impl FetchOutcome {
    /// True when the destination was populated by this attempt.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, FetchStatus::Fetched { .. })
    }
}

/// Success/failure counts over a set of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub fetched: usize,
    pub failed: usize,
}

impl FetchSummary {
    /// Tallies `outcomes`.
    #[must_use]
    pub fn from_outcomes(outcomes: &[FetchOutcome]) -> Self {
        let fetched = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            fetched,
            failed: outcomes.len() - fetched,
        }
    }

    /// Number of attempts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.fetched + self.failed
    }
}

/// Fetches a single URL into its subsection directory.
///
/// Never fails: every error is folded into [`FetchStatus::Failed`] and
/// logged. See [`attempt_fetch`] for how success is judged.
#[instrument(skip_all, fields(section = %section, subsection = %subsection))]
pub async fn fetch_resource(
    fetcher: &dyn Fetcher,
    layout: &CorpusLayout,
    section: &str,
    subsection: &str,
    url: &str,
) -> FetchOutcome {
    let file_name = destination_file_name(url);
    let destination = layout.subsection_dir(section, subsection).join(&file_name);
    let status = attempt_fetch(fetcher, url, &destination).await;

    FetchOutcome {
        section: section.to_string(),
        subsection: subsection.to_string(),
        url: url.to_string(),
        file_name,
        destination,
        status,
    }
}

/// Makes the single attempt for `url` and settles what `destination` holds.
///
/// Success is judged by the destination existing and being non-empty
/// afterwards, whatever the fetcher reported. On failure any file already at
/// `destination`, e.g. from an earlier run, is removed: a resource is on disk
/// only if its attempt in this invocation succeeded.
pub(crate) async fn attempt_fetch(fetcher: &dyn Fetcher, url: &str, destination: &Path) -> FetchStatus {
    let result = fetcher.fetch_to(url, destination).await;
    let populated = is_populated(destination).await;
    let status = match result {
        Ok(bytes) if populated => {
            info!(url = %url, path = %destination.display(), bytes, "Fetched");
            return FetchStatus::Fetched { bytes };
        }
        Ok(_) => {
            warn!(
                url = %url,
                path = %destination.display(),
                "Fetch reported success but destination is missing or empty"
            );
            FetchStatus::Failed {
                reason: format!("destination {} missing or empty", destination.display()),
            }
        }
        Err(error) => {
            warn!(url = %url, error = %error, "Fetch failed");
            FetchStatus::Failed {
                reason: error.to_string(),
            }
        }
    };

    remove_stale(destination).await;
    status
}

/// Removes a leftover destination file; a missing file is fine.
async fn remove_stale(destination: &Path) {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {
            debug!(path = %destination.display(), "Removed file left by an earlier attempt");
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => {
            warn!(
                path = %destination.display(),
                error = %error,
                "Could not remove stale destination"
            );
        }
    }
}

/// Fetches every URL declared in `spec`, each exactly once.
///
/// `concurrency` is clamped to `1..=MAX_CONCURRENCY`. Outcomes come back in
/// declaration order regardless of completion order. When two URLs share a
/// destination, the attempt that finishes last decides its content (or, if
/// it failed, its absence); with concurrency 1 that is the one declared last.
#[instrument(skip(fetcher, layout, spec), fields(urls = spec.url_count()))]
pub async fn fetch_all(
    fetcher: &dyn Fetcher,
    layout: &CorpusLayout,
    spec: &CorpusSpec,
    concurrency: usize,
) -> Vec<FetchOutcome> {
    let concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
    let jobs = spec.sections.iter().flat_map(|section| {
        section.subsections.iter().flat_map(move |subsection| {
            subsection
                .urls
                .iter()
                .map(move |url| (section.name.as_str(), subsection.name.as_str(), url.as_str()))
        })
    });

    stream::iter(jobs)
        .map(|(section, subsection, url)| fetch_resource(fetcher, layout, section, subsection, url))
        .buffered(concurrency)
        .collect()
        .await
}

async fn is_populated(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}
