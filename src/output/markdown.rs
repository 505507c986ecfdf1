//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of clone runs,
//! including page counts, the depth profile, and every failed URL.

use crate::output::summary::{CloneSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Failures listed before the table is cut short
const MAX_LISTED_FAILURES: usize = 50;

/// Writes a markdown summary of a clone run to `output_path`
///
/// # Arguments
///
/// * `summary` - The clone summary data
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(summary: &CloneSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a clone summary as markdown
pub fn format_markdown_summary(summary: &CloneSummary) -> String {
    let mut md = String::new();

    md.push_str("# Decoy-Cloner Clone Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Target**: {}\n", summary.seed_url));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", summary.total_pages()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!(
        "- **Failed Validation**: {}\n\n",
        summary.pages_invalid
    ));

    // State breakdown
    md.push_str("## Page State Breakdown\n\n");
    md.push_str("| State | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Stored | {} |\n", summary.pages_stored));
    md.push_str(&format!("| Skipped | {} |\n", summary.pages_skipped));
    md.push_str(&format!("| Failed | {} |\n\n", summary.pages_failed));

    // Depth breakdown
    if !summary.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");

        let mut depths: Vec<_> = summary.depth_breakdown.iter().collect();
        depths.sort_by_key(|(d, _)| *d);

        for (depth, count) in depths {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Failures
    if !summary.failures.is_empty() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| URL | Error |\n");
        md.push_str("|-----|-------|\n");

        for (url, error) in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            md.push_str(&format!("| {} | {} |\n", url, error.replace('|', "\\|")));
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    md
}
