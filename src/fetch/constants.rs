//! Constants for the fetch module (timeouts, concurrency bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of in-flight fetches; 1 keeps the run strictly sequential.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Upper bound on in-flight fetches.
pub const MAX_CONCURRENCY: usize = 32;

/// File name used when a URL has neither a usable path segment nor a host.
pub const FALLBACK_FILE_NAME: &str = "download";

/// Suffix of in-progress destination files.
pub const PART_SUFFIX: &str = ".part";
