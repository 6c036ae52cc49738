//! Console summaries printed to stdout.
//!
//! Logs go to stderr through `tracing`; these lines are the run's result and
//! are printed even under `--quiet`.

use std::path::Path;

use corpus_builder::provision::EXPANDED_SECTION_NAME;
use corpus_builder::{ExpandOptions, FetchStatus, PlannedFetch, RunReport};

/// Lines describing a completed run.
pub(crate) fn run_summary_lines(report: &RunReport) -> Vec<String> {
    let summary = report.fetch_summary();
    let stats = &report.manifest.statistics;

    let mut lines = vec![
        format!("Corpus '{}' built at {}", report.manifest.name, corpus_root(&report.manifest_path)),
        format!(
            "Fetched {} of {} resources ({} failed)",
            summary.fetched,
            summary.total(),
            summary.failed
        ),
        format!("Total files: {}", stats.total_files),
    ];
    for (section, section_stats) in stats.sections.iter() {
        lines.push(format!(
            "  {section}: {} files, {}",
            section_stats.files, section_stats.size
        ));
    }

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            FetchStatus::Failed { reason } => Some((outcome, reason)),
            FetchStatus::Fetched { .. } => None,
        })
        .collect();
    if !failures.is_empty() {
        lines.push("Failed:".to_string());
        for (outcome, reason) in failures {
            lines.push(format!(
                "  {}/{}: {} ({reason})",
                outcome.section, outcome.subsection, outcome.url
            ));
        }
    }

    if let Some(expansion) = &report.expansion {
        lines.push(format!(
            "Expanded references: {} downloaded, {} already present, {} failed ({} unique of {} found in {} documents)",
            expansion.references_downloaded,
            expansion.already_present,
            expansion.failed_downloads,
            expansion.unique_references,
            expansion.references_found,
            expansion.documents_processed
        ));
        lines.push(format!("Expansion log: {}", expansion.log_path.display()));
    }

    for failure in &report.provision.failed {
        lines.push(format!(
            "Directory not created: {}/{} ({})",
            failure.section, failure.subsection, failure.error
        ));
    }

    lines.push(format!("Manifest: {}", report.manifest_path.display()));
    lines
}

/// Lines describing a dry run.
pub(crate) fn plan_lines(root: &Path, planned: &[PlannedFetch], expand: Option<&ExpandOptions>) -> Vec<String> {
    let mut lines = vec![format!(
        "Dry run: {} resources would be fetched into {}",
        planned.len(),
        root.display()
    )];
    lines.extend(
        planned
            .iter()
            .map(|item| format!("  {} -> {}", item.url, item.destination.display())),
    );
    if let Some(options) = expand {
        lines.push(format!(
            "Then up to {} cited references would be downloaded into {}",
            options.max_downloads,
            root.join(EXPANDED_SECTION_NAME).display()
        ));
    }
    lines
}

pub(crate) fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn corpus_root(manifest_path: &Path) -> String {
    manifest_path
        .parent()
        .map_or_else(|| manifest_path.display().to_string(), |p| p.display().to_string())
}
