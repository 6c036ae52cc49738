//! Maps run results to the process exit status.

use corpus_builder::FetchSummary;

use crate::ProcessExit;

/// Exit outcome for a run that reached the manifest stage.
///
/// Fetch failures only affect the status under `--strict`.
pub(crate) fn determine_exit_outcome(summary: FetchSummary, strict: bool) -> ProcessExit {
    if !strict || summary.failed == 0 {
        ProcessExit::Success
    } else if summary.fetched > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
