//! Depth-tagged FIFO work queue
//!
//! Frames are served breadth-first: every frame at depth N is dequeued before
//! any frame at depth N+1, because children are only ever pushed behind their
//! parent's generation.

use std::collections::VecDeque;
use url::Url;

/// A URL waiting to be fetched, with its position in the crawl tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlFrame {
    pub url: Url,
    pub depth: u32,
    /// Position among the links enqueued from the same parent
    pub index: u32,
}

/// Pending frames of one clone run
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlFrame>,
    enqueued: u64,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CrawlFrame) {
        self.enqueued += 1;
        self.queue.push_back(frame);
    }

    pub fn pop(&mut self) -> Option<CrawlFrame> {
        self.queue.pop_front()
    }

    /// Removes every pending frame, returning them in queue order
    pub fn drain(&mut self) -> Vec<CrawlFrame> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total frames ever pushed
    pub fn total_enqueued(&self) -> u64 {
        self.enqueued
    }
}
