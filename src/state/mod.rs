//! State module for tracking clone progress
//!
//! # Components
//!
//! - `PageState`: lifecycle of a single crawl frame (pending, fetching, stored, skipped, failed)
//! - `VisitedSet`: per-run dedup of normalized URLs

mod page_state;
mod visited;

pub use page_state::PageState;
pub use visited::VisitedSet;
