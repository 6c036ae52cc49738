//! Corpus configuration model.
//!
//! A corpus is declared as a JSON document:
//!
//! ```json
//! {
//!   "name": "demo",
//!   "sections": {
//!     "papers": {
//!       "surveys": ["https://example.com/a.pdf", "https://example.com/b.pdf"]
//!     }
//!   }
//! }
//! ```
//!
//! Sections, subsections and URLs keep their declaration order. Duplicate
//! URLs inside a subsection are kept and each one is fetched.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use corpus_builder::config::CorpusSpec;
//!
//! let spec = CorpusSpec::parse(
//!     Path::new("inline.json"),
//!     r#"{"name":"demo","sections":{"a":{"x":["http://h/f1.txt"]}}}"#,
//! )
//! .unwrap();
//! assert_eq!(spec.name, "demo");
//! assert_eq!(spec.pair_count(), 1);
//! ```

mod error;

pub use error::ConfigError;

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Root corpus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSpec {
    /// Corpus identifier; the output root is `<name>_CORPUS`.
    pub name: String,
    /// Declared sections, in declaration order.
    pub sections: Vec<SectionSpec>,
}

/// One top-level grouping of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    /// Section directory name.
    pub name: String,
    /// Subsections, in declaration order.
    pub subsections: Vec<SubsectionSpec>,
}

/// A leaf directory and the resources fetched into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsectionSpec {
    /// Subsection directory name.
    pub name: String,
    /// Resource URLs, duplicates preserved.
    pub urls: Vec<String>,
}

impl CorpusSpec {
    /// Loads and validates a corpus configuration file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if `path` does not exist
    /// - [`ConfigError::Unreadable`] if it exists but cannot be read
    /// - [`ConfigError::Malformed`] if it is not JSON of the expected shape
    /// - [`ConfigError::MissingName`] if `name` is absent or empty
    /// - [`ConfigError::InvalidSegment`] if a name cannot be a directory name
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, e))?;
        let spec = Self::parse(path, &text)?;
        debug!(
            name = %spec.name,
            sections = spec.sections.len(),
            urls = spec.url_count(),
            "Loaded corpus config"
        );
        Ok(spec)
    }

    /// Parses configuration text; `source` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the filesystem errors.
    pub fn parse(source: &Path, text: &str) -> Result<Self, ConfigError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::malformed(source, e.to_string()))?;
        let Value::Object(root) = root else {
            return Err(ConfigError::malformed(source, "top level must be an object"));
        };

        let name = match root.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            Some(Value::String(_) | Value::Null) | None => {
                return Err(ConfigError::missing_name(source));
            }
            Some(_) => return Err(ConfigError::malformed(source, "`name` must be a string")),
        };
        ensure_segment(source, "name", &name)?;

        let sections = match root.get("sections") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(sections)) => parse_sections(source, sections)?,
            Some(_) => {
                return Err(ConfigError::malformed(source, "`sections` must be an object"));
            }
        };

        Ok(Self { name, sections })
    }

    /// Directory name of the corpus root.
    #[must_use]
    pub fn corpus_dir_name(&self) -> String {
        format!("{}_CORPUS", self.name)
    }

    /// Number of (section, subsection) pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.sections.iter().map(|s| s.subsections.len()).sum()
    }

    /// Number of declared URLs, duplicates included.
    #[must_use]
    pub fn url_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.subsections)
            .map(|sub| sub.urls.len())
            .sum()
    }
}

fn parse_sections(
    source: &Path,
    sections: &Map<String, Value>,
) -> Result<Vec<SectionSpec>, ConfigError> {
    sections
        .iter()
        .map(|(section_name, subsections)| {
            ensure_segment(source, "section", section_name)?;
            let Value::Object(subsections) = subsections else {
                return Err(ConfigError::malformed(
                    source,
                    format!("section `{section_name}` must be an object of URL lists"),
                ));
            };
            let subsections = subsections
                .iter()
                .map(|(sub_name, urls)| parse_subsection(source, section_name, sub_name, urls))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SectionSpec {
                name: section_name.clone(),
                subsections,
            })
        })
        .collect()
}

fn parse_subsection(
    source: &Path,
    section_name: &str,
    sub_name: &str,
    urls: &Value,
) -> Result<SubsectionSpec, ConfigError> {
    ensure_segment(source, "subsection", sub_name)?;
    let shape_error = || {
        ConfigError::malformed(
            source,
            format!("`{section_name}.{sub_name}` must be an array of URL strings"),
        )
    };
    let Value::Array(values) = urls else {
        return Err(shape_error());
    };
    let urls = values
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(shape_error))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SubsectionSpec {
        name: sub_name.to_string(),
        urls,
    })
}

/// Rejects names that would escape or collapse their parent directory.
fn ensure_segment(source: &Path, field: &'static str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    let unsafe_segment = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || value.contains('/')
        || value.contains('\\')
        || value.chars().any(char::is_control);
    if unsafe_segment {
        return Err(ConfigError::invalid_segment(source, field, value));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<CorpusSpec, ConfigError> {
        CorpusSpec::parse(Path::new("test.json"), text)
    }

    #[test]
    fn test_parse_minimal_demo_config() {
        let spec = parse(r#"{"name":"demo","sections":{"a":{"x":["http://h/f1.txt"]}}}"#).unwrap();
        assert_eq!(spec.name, "demo");
        assert_eq!(spec.corpus_dir_name(), "demo_CORPUS");
        assert_eq!(spec.sections.len(), 1);
        assert_eq!(spec.sections[0].name, "a");
        assert_eq!(spec.sections[0].subsections[0].name, "x");
        assert_eq!(spec.sections[0].subsections[0].urls, vec!["http://h/f1.txt"]);
    }

    #[test]
    fn test_parse_missing_sections_yields_empty_corpus() {
        let spec = parse(r#"{"name":"empty"}"#).unwrap();
        assert!(spec.sections.is_empty());
        assert_eq!(spec.pair_count(), 0);
        assert_eq!(spec.url_count(), 0);
    }

    #[test]
    fn test_parse_null_sections_yields_empty_corpus() {
        let spec = parse(r#"{"name":"empty","sections":null}"#).unwrap();
        assert!(spec.sections.is_empty());
    }

    #[test]
    fn test_parse_preserves_declaration_order() {
        let spec = parse(
            r#"{"name":"o","sections":{
                "zeta":{"b":[],"a":[]},
                "alpha":{"only":["u2","u1"]}
            }}"#,
        )
        .unwrap();
        let names: Vec<_> = spec.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        let subs: Vec<_> = spec.sections[0]
            .subsections
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(subs, vec!["b", "a"]);
        assert_eq!(spec.sections[1].subsections[0].urls, vec!["u2", "u1"]);
    }

    #[test]
    fn test_parse_keeps_duplicate_urls() {
        let spec = parse(r#"{"name":"d","sections":{"s":{"x":["http://h/f","http://h/f"]}}}"#)
            .unwrap();
        assert_eq!(spec.url_count(), 2);
    }

    #[test]
    fn test_parse_counts_pairs_across_sections() {
        let spec = parse(
            r#"{"name":"c","sections":{"a":{"x":[],"y":[]},"b":{"z":["u"]},"c":{}}}"#,
        )
        .unwrap();
        assert_eq!(spec.sections.len(), 3);
        assert_eq!(spec.pair_count(), 3);
        assert_eq!(spec.url_count(), 1);
    }

    #[test]
    fn test_parse_missing_name_rejected() {
        let err = parse(r#"{"sections":{}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingName { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_empty_and_null_name_rejected() {
        for text in [r#"{"name":""}"#, r#"{"name":"   "}"#, r#"{"name":null}"#] {
            let err = parse(text).unwrap_err();
            assert!(matches!(err, ConfigError::MissingName { .. }), "{text}: {err:?}");
        }
    }

    #[test]
    fn test_parse_non_string_name_is_malformed() {
        let err = parse(r#"{"name":42}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_invalid_json_is_malformed() {
        let err = parse("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_top_level_array_is_malformed() {
        let err = parse(r#"["name"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_wrong_shape_subsection_is_malformed() {
        let err = parse(r#"{"name":"n","sections":{"a":{"x":"http://h/f"}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");

        let err = parse(r#"{"name":"n","sections":{"a":{"x":[1,2]}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");

        let err = parse(r#"{"name":"n","sections":{"a":["http://h/f"]}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }), "got {err:?}");
    }

    #[test]
    fn test_parse_rejects_traversal_segments() {
        let cases = [
            r#"{"name":"../evil"}"#,
            r#"{"name":"ok","sections":{"..":{}}}"#,
            r#"{"name":"ok","sections":{"a":{"b/c":[]}}}"#,
            r#"{"name":"ok","sections":{"a\\b":{}}}"#,
            r#"{"name":"ok","sections":{"":{}}}"#,
        ];
        for text in cases {
            let err = parse(text).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSegment { .. }), "{text}: {err:?}");
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = CorpusSpec::load(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_load_directory_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let err = CorpusSpec::load(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }), "got {err:?}");
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.json");
        std::fs::write(&path, r#"{"name":"disk","sections":{"s":{"t":[]}}}"#).unwrap();
        let spec = CorpusSpec::load(&path).unwrap();
        assert_eq!(spec.name, "disk");
        assert_eq!(spec.pair_count(), 1);
    }
}
