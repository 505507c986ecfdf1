//! Output module for clone summaries and reports
//!
//! This module handles:
//! - Loading per-run statistics from the clone manifest
//! - Printing statistics to the terminal
//! - Generating markdown summaries of clone runs

mod markdown;
pub mod stats;
mod summary;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CloneStatistics};
pub use summary::{CloneSummary, OutputError, OutputResult};

use crate::state::PageState;
use crate::storage::Manifest;
use chrono::{DateTime, Utc};

/// Generates a summary of the most recent clone run
///
/// # Arguments
///
/// * `manifest` - The manifest containing clone data
///
/// # Returns
///
/// * `Ok(CloneSummary)` - Successfully generated summary
/// * `Err(OutputError)` - The manifest is empty or could not be queried
pub fn generate_summary(manifest: &dyn Manifest) -> OutputResult<CloneSummary> {
    let run = manifest.get_latest_run()?.ok_or(OutputError::NoRuns)?;

    let duration_seconds = match (
        run.started_at.parse::<DateTime<Utc>>(),
        run.finished_at.as_deref().map(str::parse::<DateTime<Utc>>),
    ) {
        (Ok(started), Some(Ok(finished))) => Some((finished - started).num_seconds().max(0) as u64),
        _ => None,
    };

    let stats = stats::load_statistics(manifest, run.id)?;
    let count = |state: PageState| stats.pages_by_state.get(&state).copied().unwrap_or(0);

    Ok(CloneSummary {
        run_id: run.id,
        seed_url: run.seed_url,
        started_at: run.started_at,
        finished_at: run.finished_at,
        duration_seconds,
        status: run.status.to_string(),
        config_hash: run.config_hash,
        pages_stored: count(PageState::Stored),
        pages_skipped: count(PageState::Skipped),
        pages_failed: count(PageState::Failed),
        pages_invalid: stats.invalid_pages,
        depth_breakdown: stats.depth_breakdown.clone(),
        failures: manifest.get_failures(run.id)?,
    })
}
