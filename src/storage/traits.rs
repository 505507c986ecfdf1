//! Storage traits and error types
//!
//! This module defines the trait interface for the clone manifest and the
//! associated error types.

use crate::state::PageState;
use crate::storage::{PageEntry, PageRecord, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Path allocation failed: {0}")]
    Allocation(String),

    #[error("Invalid page metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Index of clone runs and the terminal state of every page they touched
pub trait Manifest {
    // ===== Run Management =====

    /// Creates a new clone run and returns its ID
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status and finish timestamp of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Page Records =====

    /// Records the terminal outcome of one page, returning the row ID
    fn record_page(&mut self, run_id: i64, entry: &PageEntry) -> StorageResult<i64>;

    /// Gets every page recorded for a run, in record order
    fn get_pages(&self, run_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Finds the stored page for a URL, matching either the requested or the resolved URL
    fn find_page_by_url(&self, run_id: i64, url: &str) -> StorageResult<Option<PageRecord>>;

    // ===== Statistics =====

    /// Counts pages of a run in the given state
    fn count_pages_by_state(&self, run_id: i64, state: PageState) -> StorageResult<u64>;

    /// Counts stored pages the validator flagged
    fn count_invalid_pages(&self, run_id: i64) -> StorageResult<u64>;

    /// Gets stored page counts keyed by depth
    fn get_depth_breakdown(&self, run_id: i64) -> StorageResult<HashMap<u32, u64>>;

    /// Gets (url, error message) for every failed page
    fn get_failures(&self, run_id: i64) -> StorageResult<Vec<(String, String)>>;
}
