//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use corpus_builder::expand::{DEFAULT_MAX_DOWNLOADS, ExpandOptions};
use corpus_builder::fetch::{CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, READ_TIMEOUT_SECS};

/// Build a sectioned document corpus from a JSON description.
///
/// Creates `<name>_CORPUS/<section>/<subsection>/`, fetches every listed URL
/// once into its subsection, and writes `manifest.json` with file counts and
/// sizes per section. With `--expand`, references cited in the fetched text
/// documents are then downloaded into `EXPANDED_REFERENCES/`.
#[derive(Parser, Debug)]
#[command(name = "corpus-builder")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the corpus configuration (JSON)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Directory in which `<name>_CORPUS` is created
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum concurrent fetches (1 = strictly sequential)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=MAX_CONCURRENCY as i64))]
    pub concurrency: u8,

    /// Connection timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Validate the configuration and list planned files without fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Exit non-zero when fetches fail (1 = some failed, 2 = all failed)
    #[arg(long)]
    pub strict: bool,

    /// After fetching, download references cited in the corpus documents
    #[arg(long)]
    pub expand: bool,

    /// With --expand: stop once this many references are in place
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DOWNLOADS)]
    pub max_downloads: usize,

    /// With --expand: only scan this section (repeatable)
    #[arg(long = "expand-section", value_name = "SECTION")]
    pub expand_sections: Vec<String>,

    /// With --expand: document extension to scan, e.g. .md (repeatable; default .txt and .md)
    #[arg(long = "expand-file-type", value_name = "EXT")]
    pub expand_file_types: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Expansion settings, or `None` without `--expand`.
    pub fn expand_options(&self) -> Option<ExpandOptions> {
        if !self.expand {
            return None;
        }
        let mut options = ExpandOptions {
            max_downloads: self.max_downloads,
            sections: self.expand_sections.clone(),
            ..ExpandOptions::default()
        };
        if !self.expand_file_types.is_empty() {
            options.file_types.clone_from(&self.expand_file_types);
        }
        Some(options)
    }

    /// Default log level from the verbosity flags.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["corpus-builder", "corpus.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("corpus.json"));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.concurrency, 1);
        assert_eq!(args.connect_timeout, 30);
        assert_eq!(args.read_timeout, 300);
        assert!(!args.dry_run);
        assert!(!args.strict);
        assert!(args.expand_options().is_none());
        assert_eq!(args.default_log_level(), "info");
    }

    #[test]
    fn test_cli_missing_config_is_usage_error() {
        let err = Args::try_parse_from(["corpus-builder"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["corpus-builder", "c.json", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn test_cli_quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "-q", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["corpus-builder", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["corpus-builder", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_output_dir_short_and_long() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "-o", "/tmp/out"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));

        let args = Args::try_parse_from(["corpus-builder", "--output-dir", "out", "c.json"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("out"));
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "-c", "32"]).unwrap();
        assert_eq!(args.concurrency, 32);

        let err = Args::try_parse_from(["corpus-builder", "c.json", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["corpus-builder", "c.json", "-c", "33"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Timeout Tests ====================

    #[test]
    fn test_cli_timeouts_accept_range() {
        let args = Args::try_parse_from([
            "corpus-builder",
            "c.json",
            "--connect-timeout",
            "5",
            "--read-timeout",
            "3600",
        ])
        .unwrap();
        assert_eq!(args.connect_timeout, 5);
        assert_eq!(args.read_timeout, 3600);
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let err =
            Args::try_parse_from(["corpus-builder", "c.json", "--read-timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_mode_flags() {
        let args =
            Args::try_parse_from(["corpus-builder", "c.json", "--dry-run", "--strict", "--no-color"])
                .unwrap();
        assert!(args.dry_run);
        assert!(args.strict);
        assert!(args.no_color);
    }

    // ==================== Expansion Tests ====================

    #[test]
    fn test_cli_expand_defaults() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "--expand"]).unwrap();
        let options = args.expand_options().unwrap();
        assert_eq!(options, ExpandOptions::default());
        assert_eq!(options.max_downloads, 50);
    }

    #[test]
    fn test_cli_expand_repeatable_filters() {
        let args = Args::try_parse_from([
            "corpus-builder",
            "c.json",
            "--expand",
            "--max-downloads",
            "3",
            "--expand-section",
            "papers",
            "--expand-section",
            "notes",
            "--expand-file-type",
            ".tex",
        ])
        .unwrap();
        let options = args.expand_options().unwrap();
        assert_eq!(options.max_downloads, 3);
        assert_eq!(options.sections, vec!["papers", "notes"]);
        assert_eq!(options.file_types, vec![".tex"]);
    }

    #[test]
    fn test_cli_expand_settings_ignored_without_flag() {
        let args = Args::try_parse_from(["corpus-builder", "c.json", "--max-downloads", "3"]).unwrap();
        assert!(args.expand_options().is_none());
    }

    #[test]
    fn test_cli_max_downloads_rejects_non_number() {
        let err = Args::try_parse_from(["corpus-builder", "c.json", "--max-downloads", "many"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
