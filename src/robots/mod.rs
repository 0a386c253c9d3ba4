//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing the crawl origin's
//! robots.txt and answering allow/deny questions for it.

mod parser;
mod policy;

pub use parser::ParsedRobots;
pub use policy::{RobotsPolicy, RobotsSource};
