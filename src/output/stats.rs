//! Statistics generation from the clone manifest
//!
//! This module provides functionality for extracting and displaying
//! clone statistics from the manifest.

use crate::output::summary::OutputResult;
use crate::state::PageState;
use crate::storage::Manifest;
use std::collections::HashMap;

/// Clone statistics for one run
#[derive(Debug, Clone)]
pub struct CloneStatistics {
    pub run_id: i64,

    /// Total number of pages that reached a terminal state
    pub total_pages: u64,

    /// Count of pages by terminal state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Stored pages the validator rejected
    pub invalid_pages: u64,

    /// Stored pages by depth
    pub depth_breakdown: HashMap<u32, u64>,
}

/// Loads statistics for a run from the manifest
///
/// # Arguments
///
/// * `manifest` - The manifest to query
/// * `run_id` - The run to summarize
pub fn load_statistics(manifest: &dyn Manifest, run_id: i64) -> OutputResult<CloneStatistics> {
    let mut pages_by_state = HashMap::new();
    let mut total_pages = 0;

    for state in PageState::terminal_states() {
        let count = manifest.count_pages_by_state(run_id, state)?;
        total_pages += count;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    Ok(CloneStatistics {
        run_id,
        total_pages,
        pages_by_state,
        invalid_pages: manifest.count_invalid_pages(run_id)?,
        depth_breakdown: manifest.get_depth_breakdown(run_id)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CloneStatistics) {
    println!("=== Clone Statistics (run {}) ===\n", stats.run_id);

    println!("Overview:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Failed validation: {}", stats.invalid_pages);
    println!();

    println!("Pages by State:");
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !stats.depth_breakdown.is_empty() {
        println!("Stored Pages by Depth:");
        let mut depths: Vec<_> = stats.depth_breakdown.iter().collect();
        depths.sort_by_key(|(depth, _)| **depth);
        for (depth, count) in depths {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    let stored = stats.pages_by_state.get(&PageState::Stored).unwrap_or(&0);
    let failed = stats.pages_by_state.get(&PageState::Failed).unwrap_or(&0);
    let fetched = stored + failed;
    let success_rate = if fetched > 0 {
        (*stored as f64 / fetched as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} fetched pages stored)",
        success_rate, stored, fetched
    );
}
