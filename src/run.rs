//! Run driver: provision, fetch, optionally expand, then aggregate, in that
//! order and once each.

use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::CorpusSpec;
use crate::expand::{ExpandError, ExpandOptions, ExpansionReport, expand};
use crate::fetch::{DEFAULT_CONCURRENCY, FetchOutcome, FetchSummary, Fetcher, destination_file_name, fetch_all};
use crate::manifest::{Manifest, ManifestError, aggregate_including, write_manifest};
use crate::provision::{CorpusLayout, EXPANDED_SECTION_NAME, ProvisionError, ProvisionReport, provision};

/// Errors that abort a run.
///
/// Per-directory and per-URL failures are not here: they are recorded in the
/// [`RunReport`] and the run carries on. Configuration errors surface from
/// [`CorpusSpec::load`] before a run starts.
#[derive(Debug, Error)]
pub enum RunError {
    /// The corpus root could not be created.
    #[error("cannot create corpus root: {0}")]
    Root(#[source] ProvisionError),

    /// Reference expansion could not set up its directory or write its log.
    #[error(transparent)]
    Expand(#[from] ExpandError),

    /// The manifest could not be built or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Where the corpus lives; every component works from this root.
    pub corpus: CorpusLayout,
    /// Maximum attempts in flight; 1 is strictly sequential.
    pub concurrency: usize,
    /// Reference expansion after fetching; off when `None`.
    pub expand: Option<ExpandOptions>,
}

impl RunConfig {
    /// Places the corpus for `spec` under `output_dir`.
    #[must_use]
    pub fn new(output_dir: &Path, spec: &CorpusSpec) -> Self {
        Self {
            corpus: CorpusLayout::for_spec(output_dir, spec),
            concurrency: DEFAULT_CONCURRENCY,
            expand: None,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Enables reference expansion with `options`.
    #[must_use]
    pub fn with_expansion(mut self, options: ExpandOptions) -> Self {
        self.expand = Some(options);
        self
    }
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub provision: ProvisionReport,
    /// One outcome per declared URL, in declaration order.
    pub outcomes: Vec<FetchOutcome>,
    /// Present when expansion was enabled.
    pub expansion: Option<ExpansionReport>,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

impl RunReport {
    #[must_use]
    pub fn fetch_summary(&self) -> FetchSummary {
        FetchSummary::from_outcomes(&self.outcomes)
    }
}

/// A fetch the run would attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFetch {
    pub section: String,
    pub subsection: String,
    pub url: String,
    pub destination: PathBuf,
}

/// Lists every fetch in declaration order without touching disk or network.
#[must_use]
pub fn plan(config: &RunConfig, spec: &CorpusSpec) -> Vec<PlannedFetch> {
    let mut planned = Vec::with_capacity(spec.url_count());
    for section in &spec.sections {
        for subsection in &section.subsections {
            let dir = config.corpus.subsection_dir(&section.name, &subsection.name);
            planned.extend(subsection.urls.iter().map(|url| PlannedFetch {
                section: section.name.clone(),
                subsection: subsection.name.clone(),
                url: url.clone(),
                destination: dir.join(destination_file_name(url)),
            }));
        }
    }
    planned
}

/// Builds the corpus described by `spec`.
///
/// Directories are provisioned before the first fetch, and the manifest is
/// aggregated only after every fetch, expansion downloads included, has
/// finished. With expansion on, the manifest gains an `EXPANDED_REFERENCES`
/// section entry.
///
/// # Errors
///
/// Returns [`RunError::Root`] if the corpus root cannot be created,
/// [`RunError::Expand`] if expansion cannot set up its directory or log, and
/// [`RunError::Manifest`] if the manifest cannot be written. Fetch and
/// subsection failures never abort the run.
#[instrument(skip_all, fields(corpus = %spec.name, root = %config.corpus.root().display()))]
pub async fn run(config: &RunConfig, spec: &CorpusSpec, fetcher: &dyn Fetcher) -> Result<RunReport, RunError> {
    info!(
        sections = spec.sections.len(),
        subsections = spec.pair_count(),
        urls = spec.url_count(),
        "Building corpus"
    );

    let provision = provision(&config.corpus, spec).map_err(RunError::Root)?;
    if !provision.is_complete() {
        warn!(
            failed = provision.failed.len(),
            ready = provision.ready_count(),
            "Some subsection directories could not be created"
        );
    }
    let outcomes = fetch_all(fetcher, &config.corpus, spec, config.concurrency).await;

    let summary = FetchSummary::from_outcomes(&outcomes);
    info!(fetched = summary.fetched, failed = summary.failed, "Fetching complete");

    let expansion = match &config.expand {
        Some(options) => Some(expand(fetcher, &config.corpus, spec, options).await?),
        None => None,
    };
    let extra: &[&str] = if expansion.is_some() {
        &[EXPANDED_SECTION_NAME]
    } else {
        &[]
    };

    let manifest = aggregate_including(&config.corpus, spec, extra, Utc::now())?;
    let manifest_path = write_manifest(&config.corpus, &manifest)?;

    Ok(RunReport {
        provision,
        outcomes,
        expansion,
        manifest,
        manifest_path,
    })
}
