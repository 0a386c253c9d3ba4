//! Path-segment hierarchy of the crawled pages
//!
//! The tree is keyed purely on URL path segments: `/a/b` and `/a/c` share the node
//! `a` no matter how the crawler reached them. Children live in ordered maps and
//! counts are sums, so insertion order never changes the result.

use crate::output::writer::write_json_document;
use crate::url::{path_has_prefix, path_segments};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use url::Url;

/// One path segment in the hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Path segment (the root carries the origin host)
    pub name: String,

    /// Pages at or beneath this node
    pub count: u64,

    pub children: BTreeMap<String, HierarchyNode>,
}

/// The serialized shape consumed by the D3 visualizations
///
/// Inner nodes carry `children` (sorted by name), leaves carry `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<D3Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u64>,
}

impl HierarchyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            children: BTreeMap::new(),
        }
    }

    /// Adds one page whose path splits into `segments`
    pub fn insert_segments<'a>(&mut self, segments: impl IntoIterator<Item = &'a str>) {
        self.count += 1;
        let mut node = self;
        for segment in segments.into_iter().filter(|s| !s.is_empty()) {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| HierarchyNode::new(segment));
            node.count += 1;
        }
    }

    /// Returns the descendant reached by following `segments`
    pub fn find(&self, segments: &[&str]) -> Option<&HierarchyNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| node.children.get(*segment))
    }

    /// Number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(HierarchyNode::node_count).sum::<usize>()
    }

    /// Converts to the visualization shape
    pub fn to_d3(&self) -> D3Node {
        if self.children.is_empty() {
            D3Node {
                name: self.name.clone(),
                children: None,
                value: Some(self.count),
            }
        } else {
            D3Node {
                name: self.name.clone(),
                children: Some(self.children.values().map(HierarchyNode::to_d3).collect()),
                value: None,
            }
        }
    }
}

/// Path prefixes excluded from a hierarchy
///
/// A prefix matches its own path and everything beneath it, segment-wise:
/// `/s` excludes `/s` and `/s/minisitios` but not `/services`.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    prefixes: Vec<String>,
}

impl PathFilter {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn excludes(&self, url: &Url) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| path_has_prefix(url.path(), prefix))
    }
}

/// Incremental hierarchy fold over page URLs
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    root: HierarchyNode,
    filter: PathFilter,
    excluded: u64,
}

impl HierarchyBuilder {
    /// Starts an empty tree whose root is named `root_name`
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_filter(root_name, PathFilter::default())
    }

    /// Starts an empty tree that skips pages matched by `filter`
    pub fn with_filter(root_name: impl Into<String>, filter: PathFilter) -> Self {
        Self {
            root: HierarchyNode::new(root_name),
            filter,
            excluded: 0,
        }
    }

    /// Adds one page URL; returns false if it was unparseable or filtered out
    pub fn insert_url(&mut self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Skipping unparseable URL {} in hierarchy: {}", url, e);
                return false;
            }
        };

        if self.filter.excludes(&parsed) {
            self.excluded += 1;
            return false;
        }

        self.insert_segments(path_segments(&parsed));
        true
    }

    /// Adds one page by its path segments, bypassing the filter
    pub fn insert_segments<'a>(&mut self, segments: impl IntoIterator<Item = &'a str>) {
        self.root.insert_segments(segments);
    }

    /// Pages included so far
    pub fn pages(&self) -> u64 {
        self.root.count
    }

    /// Pages skipped by the filter so far
    pub fn excluded(&self) -> u64 {
        self.excluded
    }

    pub fn build(self) -> HierarchyNode {
        self.root
    }
}

/// Writes the hierarchy artifact as one JSON document
pub fn write_hierarchy(root: &HierarchyNode, path: impl AsRef<Path>) -> Result<()> {
    write_json_document(&root.to_d3(), path)
}

/// Counters from re-reading a page stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub lines: u64,
    pub included: u64,
    pub excluded: u64,
    /// Records with no status (robots-blocked, never fetched)
    pub unfetched: u64,
    pub malformed: u64,
}

#[derive(Deserialize)]
struct PageFields {
    url: String,
    #[serde(default)]
    status_code: Option<u16>,
}

/// Re-derives a hierarchy from a page stream written by a previous run
///
/// Only fetched pages count, as in a live run: records without a status code
/// are skipped. Lines that are not JSON objects with a `url` string (invalid
/// UTF-8 included) are skipped and counted.
pub fn rebuild_from_pages(
    pages_path: impl AsRef<Path>,
    root_name: &str,
    filter: &PathFilter,
) -> Result<(HierarchyNode, RebuildStats)> {
    let pages_path = pages_path.as_ref();
    let file = File::open(pages_path).map_err(|source| crate::AtlasError::Output {
        path: pages_path.display().to_string(),
        source,
    })?;

    let mut builder = HierarchyBuilder::with_filter(root_name, filter.clone());
    let mut stats = RebuildStats::default();

    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        stats.lines += 1;

        match serde_json::from_slice::<PageFields>(&line) {
            Ok(PageFields {
                status_code: None, ..
            }) => stats.unfetched += 1,
            Ok(record) => {
                if builder.insert_url(&record.url) {
                    stats.included += 1;
                }
            }
            Err(_) => stats.malformed += 1,
        }
    }

    stats.excluded = builder.excluded();
    tracing::info!(
        "Rebuilt hierarchy from {}: {} included, {} excluded, {} unfetched, {} malformed",
        pages_path.display(),
        stats.included,
        stats.excluded,
        stats.unfetched,
        stats.malformed
    );

    Ok((builder.build(), stats))
}
