//! Storage module for persisting cloned pages
//!
//! This module handles everything a clone run writes to disk:
//! - Unique page directories (path allocation)
//! - Page content and metadata files for the replay server
//! - The SQLite clone manifest (runs and terminal page states)

mod allocator;
mod pages;
mod schema;
mod sqlite;
mod traits;

pub use allocator::{PathAllocator, UniquePathAllocator};
pub use pages::{ClonedPage, PageMeta, PageStore, CONTENT_FILE, META_FILE};
pub use sqlite::SqliteManifest;
pub use traits::{Manifest, StorageError, StorageResult};

use crate::state::PageState;

/// A terminal page outcome to be written to the manifest
#[derive(Debug, Clone)]
pub struct PageEntry {
    pub url: String,
    pub resolved_url: Option<String>,
    pub path: Option<String>,
    pub depth: u32,
    pub sibling_index: u32,
    pub state: PageState,
    pub content_type: Option<String>,
    pub status_code: Option<u16>,
    pub valid: Option<bool>,
    pub error_message: Option<String>,
}

impl PageEntry {
    /// Entry for a page that never produced stored content
    pub fn failed(url: &str, depth: u32, sibling_index: u32, error: &str) -> Self {
        Self {
            url: url.to_string(),
            resolved_url: None,
            path: None,
            depth,
            sibling_index,
            state: PageState::Failed,
            content_type: None,
            status_code: None,
            valid: None,
            error_message: Some(error.to_string()),
        }
    }
}

/// Represents a page row in the manifest
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub run_id: i64,
    pub url: String,
    pub resolved_url: Option<String>,
    pub path: Option<String>,
    pub depth: u32,
    pub sibling_index: u32,
    pub state: PageState,
    pub content_type: Option<String>,
    pub status_code: Option<u16>,
    pub valid: Option<bool>,
    pub error_message: Option<String>,
    pub recorded_at: String,
}

/// Represents a clone run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a clone run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_from_db_string() {
        assert_eq!(
            RunStatus::from_db_string("interrupted"),
            Some(RunStatus::Interrupted)
        );
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }

    #[test]
    fn test_failed_entry() {
        let entry = PageEntry::failed("http://example.com/x", 2, 1, "connection refused");
        assert_eq!(entry.state, PageState::Failed);
        assert!(entry.path.is_none());
        assert_eq!(entry.error_message.as_deref(), Some("connection refused"));
    }
}
