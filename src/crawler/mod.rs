//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Politeness-delayed HTTP fetching
//! - HTML metadata and link extraction
//! - The breadth-first frontier and visited set
//! - Sitemap seeding
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
pub mod sitemap;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, FetchResponse, Fetcher};
pub use frontier::{Admission, Frontier, FrontierEntry};
pub use parser::{extract, PageMeta};
pub use sitemap::{collect_sitemap_urls, parse_sitemap, sitemap_sources, SitemapDocument};
