//! CLI entry point for the corpus builder.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use corpus_builder::{CorpusSpec, HttpFetcher, RunConfig, SchemeFetcher, plan, run};
use tracing::{debug, info};

mod cli;
mod exit_handler;
mod output;
mod terminal;

use cli::Args;

/// Process outcome once configuration has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    /// Some fetches failed (`--strict` only).
    Partial,
    /// Every fetch failed (`--strict` only).
    Failure,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
        }
    }
}

/// Exit status for configuration, root, expansion and manifest errors.
const FATAL_EXIT_CODE: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    match run_cli(&args).await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn run_cli(args: &Args) -> Result<ProcessExit> {
    let spec = CorpusSpec::load(&args.config)?;
    let mut config = RunConfig::new(&args.output_dir, &spec).with_concurrency(usize::from(args.concurrency));
    if let Some(options) = args.expand_options() {
        config = config.with_expansion(options);
    }

    if args.dry_run {
        let planned = plan(&config, &spec);
        output::print_lines(&output::plan_lines(config.corpus.root(), &planned, config.expand.as_ref()));
        return Ok(ProcessExit::Success);
    }

    info!(corpus = %spec.name, root = %config.corpus.root().display(), "Corpus builder starting");

    let http = HttpFetcher::with_timeouts(args.connect_timeout, args.read_timeout)
        .context("failed to build HTTP client")?;
    let fetcher = SchemeFetcher::with_http(http);

    let report = run(&config, &spec, &fetcher).await?;
    output::print_lines(&output::run_summary_lines(&report));

    Ok(exit_handler::determine_exit_outcome(report.fetch_summary(), args.strict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Partial.code(), 1);
        assert_eq!(ProcessExit::Failure.code(), 2);
    }
}
