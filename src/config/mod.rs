//! Configuration module for Site-Atlas
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only `crawler.base-url` is required; every other key has a default.
//!
//! # Example
//!
//! ```no_run
//! use site_atlas::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("atlas.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HierarchyConfig, OutputConfig, SitemapConfig, UserAgentConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_exclude_prefixes};
