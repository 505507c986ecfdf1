//! Clone summary types
//!
//! This module defines the data structure summarizing one clone run and the
//! error type for writing it out.

use thiserror::Error;
use std::collections::HashMap;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("No clone runs found in manifest")]
    NoRuns,
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Summary statistics for a clone run
#[derive(Debug, Clone, Default)]
pub struct CloneSummary {
    // Run metadata
    pub run_id: i64,
    pub seed_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<u64>,
    pub status: String,
    pub config_hash: String,

    // State breakdown
    pub pages_stored: u64,
    pub pages_skipped: u64,
    pub pages_failed: u64,
    pub pages_invalid: u64,

    // Depth breakdown (depth -> stored pages)
    pub depth_breakdown: HashMap<u32, u64>,

    // (url, error) for every failed page
    pub failures: Vec<(String, String)>,
}

impl CloneSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of pages in terminal states
    pub fn total_pages(&self) -> u64 {
        self.pages_stored + self.pages_skipped + self.pages_failed
    }

    /// Returns the share of fetched pages that were stored, as a percentage
    pub fn success_rate(&self) -> f64 {
        let fetched = self.pages_stored + self.pages_failed;
        if fetched == 0 {
            return 0.0;
        }
        (self.pages_stored as f64 / fetched as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_summary_new() {
        let summary = CloneSummary::new();
        assert_eq!(summary.total_pages(), 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_total_pages() {
        let mut summary = CloneSummary::new();
        summary.pages_stored = 100;
        summary.pages_failed = 10;
        summary.pages_skipped = 5;

        assert_eq!(summary.total_pages(), 115);
    }

    #[test]
    fn test_success_rate_ignores_skipped() {
        let mut summary = CloneSummary::new();
        summary.pages_stored = 80;
        summary.pages_failed = 20;
        summary.pages_skipped = 50;

        assert!((summary.success_rate() - 80.0).abs() < 0.01);
    }

    #[test]
    fn test_success_rate_zero_pages() {
        assert_eq!(CloneSummary::new().success_rate(), 0.0);
    }
}
