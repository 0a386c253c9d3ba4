//! Output module for crawl records and reports
//!
//! This module handles:
//! - The page, edge and error record types
//! - Append-only JSON-lines streams for those records
//! - The path-segment hierarchy document
//! - Run statistics and the end-of-run summary

pub mod hierarchy;
mod records;
pub mod stats;
mod traits;
mod writer;

pub use hierarchy::{
    rebuild_from_pages, write_hierarchy, D3Node, HierarchyBuilder, HierarchyNode, PathFilter,
    RebuildStats,
};
pub use records::{EdgeRecord, ErrorRecord, PageRecord};
pub use stats::{print_statistics, CrawlStats};
pub use traits::{JsonlOutput, OutputHandler};
pub use writer::{write_json_document, JsonlWriter};
