//! Visited-URL tracking for a clone run
//!
//! Identity is the normalized URL string, so callers normalize before asking.

use std::collections::HashSet;
use url::Url;

/// Per-run record of normalized URLs that have been claimed for fetching
///
/// The set is append-only for the lifetime of a clone run. It is owned by the
/// run loop, so `check_and_mark` never races with another branch of the
/// traversal.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the URL visited; returns true only the first time it is seen
    ///
    /// The URL must already be normalized.
    pub fn check_and_mark(&mut self, url: &Url) -> bool {
        self.seen.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.seen.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
