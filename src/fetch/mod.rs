//! Resource retrieval into provisioned corpus directories.
//!
//! This module fetches every declared URL into
//! `<root>/<section>/<subsection>/<final path segment>`.
//!
//! # Features
//!
//! - Pluggable retrieval through the [`Fetcher`] capability trait
//! - HTTP(S) via [`HttpFetcher`], local `file://` copies via [`FileFetcher`]
//! - One attempt per URL: no retry, no resume
//! - Failed attempts never leave partial files behind, and remove any
//!   earlier file at their destination
//! - Optional bounded concurrency with results kept in declaration order
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use corpus_builder::config::CorpusSpec;
//! use corpus_builder::fetch::{SchemeFetcher, fetch_all};
//! use corpus_builder::provision::{CorpusLayout, provision};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = CorpusSpec::load(Path::new("corpus.json"))?;
//! let layout = CorpusLayout::for_spec(Path::new("."), &spec);
//! provision(&layout, &spec)?;
//! let outcomes = fetch_all(&SchemeFetcher::new()?, &layout, &spec, 1).await;
//! println!("{} resources attempted", outcomes.len());
//! # Ok(())
//! # }
//! ```

mod batch;
mod constants;
mod error;
mod file;
mod filename;
mod http;
mod part;

pub use batch::{FetchOutcome, FetchStatus, FetchSummary, fetch_all, fetch_resource};
pub(crate) use batch::attempt_fetch;
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use file::FileFetcher;
pub use filename::destination_file_name;
pub(crate) use filename::sanitize_filename;
pub use http::HttpFetcher;

use std::path::Path;

use async_trait::async_trait;
use url::Url;

/// Capability to retrieve one resource to a local path.
///
/// Implementations make exactly one attempt and leave either a populated
/// `destination` or no new file at all. What happens to a file already at
/// `destination` when the attempt fails is decided by the caller; the batch
/// functions in this module remove it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieves `url` into `destination`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] describing why the attempt failed.
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, FetchError>;
}

/// Default fetcher: routes `http`/`https` to [`HttpFetcher`] and `file` to
/// [`FileFetcher`].
#[derive(Debug, Clone)]
pub struct SchemeFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SchemeFetcher {
    /// Creates a router with default HTTP timeouts.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` builder error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_http(HttpFetcher::new()?))
    }

    /// Creates a router around a preconfigured HTTP fetcher.
    #[must_use]
    pub fn with_http(http: HttpFetcher) -> Self {
        Self {
            http,
            file: FileFetcher,
        }
    }
}

#[async_trait]
impl Fetcher for SchemeFetcher {
    async fn fetch_to(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        match parsed.scheme() {
            "http" | "https" => self.http.fetch_to(url, destination).await,
            "file" => self.file.fetch_to(url, destination).await,
            other => Err(FetchError::unsupported_scheme(url, other)),
        }
    }
}
