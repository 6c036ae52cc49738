//! Corpus Builder Library
//!
//! Turns a declarative JSON corpus description into an on-disk tree of
//! fetched documents plus a statistics manifest.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Corpus configuration loading and validation
//! - [`provision`] - Directory layout and idempotent creation
//! - [`fetch`] - Single-attempt resource retrieval (HTTP and `file://`)
//! - [`expand`] - Reference extraction and download into `EXPANDED_REFERENCES`
//! - [`manifest`] - Tree statistics and atomic manifest persistence
//! - [`run`] - Sequencing of the stages above

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod expand;
pub mod fetch;
pub mod manifest;
pub mod provision;
pub mod run;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, CorpusSpec, SectionSpec, SubsectionSpec};
pub use expand::{ExpandError, ExpandOptions, ExpansionReport, ReferenceStatus};
pub use fetch::{
    FetchError, FetchOutcome, FetchStatus, FetchSummary, Fetcher, FileFetcher, HttpFetcher,
    SchemeFetcher,
};
pub use manifest::{Manifest, ManifestBuilder, ManifestError, SectionStats};
pub use provision::{CorpusLayout, ProvisionError, ProvisionReport};
pub use run::{PlannedFetch, RunConfig, RunError, RunReport, plan, run};
