//! Error types for corpus configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a corpus configuration.
///
/// Every variant is a pre-flight failure: it is raised before any directory
/// is created or any URL is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration path does not exist.
    #[error("config file not found: {path}")]
    NotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The configuration path exists but could not be read.
    #[error("cannot read config file {path}: {source}")]
    Unreadable {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration content is not valid JSON or has the wrong shape.
    #[error("malformed config file {path}: {reason}")]
    Malformed {
        /// The offending configuration file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// `name` is absent, null or empty.
    #[error("config file {path} has no corpus name\n  Suggestion: add a non-empty \"name\" field")]
    MissingName {
        /// The offending configuration file.
        path: PathBuf,
    },

    /// A name that becomes a directory is not a single safe path segment.
    #[error("config file {path}: {field} '{value}' is not usable as a directory name")]
    InvalidSegment {
        /// The offending configuration file.
        path: PathBuf,
        /// Which kind of name was rejected (`name`, `section`, `subsection`).
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl ConfigError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an unreadable-file error.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unreadable {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-content error.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing-name error.
    pub fn missing_name(path: impl Into<PathBuf>) -> Self {
        Self::MissingName { path: path.into() }
    }

    /// Creates an invalid-segment error.
    pub fn invalid_segment(
        path: impl Into<PathBuf>,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidSegment {
            path: path.into(),
            field,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_not_found_display() {
        let msg = ConfigError::not_found("/tmp/missing.json").to_string();
        assert!(msg.contains("not found"), "Expected 'not found' in: {msg}");
        assert!(msg.contains("/tmp/missing.json"), "Expected path in: {msg}");
    }

    #[test]
    fn test_config_error_missing_name_has_suggestion() {
        let msg = ConfigError::missing_name("corpus.json").to_string();
        assert!(msg.contains("no corpus name"), "Expected reason in: {msg}");
        assert!(msg.contains("Suggestion"), "Expected suggestion in: {msg}");
    }

    #[test]
    fn test_config_error_invalid_segment_names_field_and_value() {
        let msg = ConfigError::invalid_segment("corpus.json", "section", "..").to_string();
        assert!(msg.contains("section '..'"), "Expected field and value in: {msg}");
    }
}
