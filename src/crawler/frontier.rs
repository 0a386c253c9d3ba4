//! Frontier and visited tracking for the breadth-first traversal
//!
//! This module handles:
//! - The FIFO queue of URLs waiting to be processed
//! - The visited set, the only authority on whether a URL was already admitted
//! - The depth and page-count limits applied when a URL is first discovered
//!
//! Entries are dequeued in the order they were admitted. Since every child is
//! admitted at its parent's depth + 1, depths leave the queue non-decreasing and all
//! of depth d is processed before anything at depth d + 1.

use std::collections::{HashSet, VecDeque};

/// A URL admitted to the frontier and waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Canonical URL to fetch
    pub url: String,

    /// Page on which the URL was discovered (None for the seed)
    pub parent_url: Option<String>,

    /// Distance from the seed in link hops
    pub depth: u32,
}

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting; the URL is now queued
    Queued,
    /// The URL was admitted earlier in this run
    AlreadySeen,
    /// The URL lies beyond the maximum depth
    DepthExceeded,
    /// The run already admitted its maximum number of URLs
    PageLimitReached,
}

/// FIFO frontier with an at-most-once admission gate
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    max_depth: u32,
    max_pages: Option<u64>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Deepest admissible depth (the seed is depth 0)
    /// * `max_pages` - Maximum number of distinct URLs ever admitted, None for unbounded
    pub fn new(max_depth: u32, max_pages: Option<u64>) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            max_depth,
            max_pages,
        }
    }

    /// Offers a discovered URL to the frontier
    ///
    /// The URL is queued only if it was never admitted before, `depth` does not
    /// exceed the maximum depth and the page budget is not exhausted. Admission
    /// inserts the URL into the visited set, so it can never be queued again.
    pub fn offer(&mut self, url: &str, parent_url: Option<&str>, depth: u32) -> Admission {
        if self.visited.contains(url) {
            return Admission::AlreadySeen;
        }

        if depth > self.max_depth {
            return Admission::DepthExceeded;
        }

        if self
            .max_pages
            .is_some_and(|limit| self.visited.len() as u64 >= limit)
        {
            return Admission::PageLimitReached;
        }

        self.visited.insert(url.to_string());
        self.queue.push_back(FrontierEntry {
            url: url.to_string(),
            parent_url: parent_url.map(str::to_string),
            depth,
        });

        tracing::trace!("Queued {} at depth {}", url, depth);
        Admission::Queued
    }

    /// Removes the oldest queued entry
    pub fn pop(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    /// Returns the number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs admitted so far (queued or processed)
    pub fn seen_count(&self) -> usize {
        self.visited.len()
    }

    /// Returns whether the URL was ever admitted
    pub fn has_seen(&self, url: &str) -> bool {
        self.visited.contains(url)
    }
}
