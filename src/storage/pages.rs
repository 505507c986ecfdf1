//! On-disk page layout consumed by the replay server
//!
//! Each cloned page owns one allocated directory holding:
//! - `content`: the raw bytes as fetched (or the rendered DOM)
//! - `meta.json`: the URLs and fetch metadata needed to serve it back
//!
//! `meta.json` is written last. A directory without it is incomplete and a
//! failed write removes the directory altogether.

use crate::storage::allocator::PathAllocator;
use crate::storage::traits::StorageResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CONTENT_FILE: &str = "content";
pub const META_FILE: &str = "meta.json";

/// Metadata written next to every cloned page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// URL the crawl requested
    pub url: String,
    /// URL the fetch backend ended on after redirects
    pub resolved_url: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub depth: u32,
    pub sibling_index: u32,
    /// Validator verdict; absent when validation is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    pub fetched_at: String,
}

/// A page ready to be written, or read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedPage {
    pub meta: PageMeta,
    pub content: Vec<u8>,
}

/// Writes cloned pages into freshly allocated directories
#[derive(Clone)]
pub struct PageStore {
    allocator: Arc<dyn PathAllocator>,
}

impl PageStore {
    pub fn new(allocator: Arc<dyn PathAllocator>) -> Self {
        Self { allocator }
    }

    /// Allocates a directory and writes the page into it
    ///
    /// Returns the allocated directory. A page is written exactly once; the
    /// directory is never reused.
    pub fn store(&self, page: &ClonedPage) -> StorageResult<PathBuf> {
        let dir = self.allocator.allocate()?;
        if let Err(e) = Self::write_files(&dir, page) {
            if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                tracing::warn!(
                    "Failed to remove partial page {}: {}",
                    dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }
        Ok(dir)
    }

    fn write_files(dir: &Path, page: &ClonedPage) -> StorageResult<()> {
        std::fs::write(dir.join(CONTENT_FILE), &page.content)?;
        std::fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&page.meta)?)?;
        Ok(())
    }

    /// Reads a page back from its directory
    pub fn read(dir: &Path) -> StorageResult<ClonedPage> {
        let meta: PageMeta = serde_json::from_slice(&std::fs::read(dir.join(META_FILE))?)?;
        let content = std::fs::read(dir.join(CONTENT_FILE))?;
        Ok(ClonedPage { meta, content })
    }
}
