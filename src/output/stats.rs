//! Run statistics and the end-of-run summary
//!
//! Counters are tallied by the crawl driver as records are emitted; nothing is
//! re-read from the output streams.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Seed URL after canonicalization
    pub seed_url: String,

    /// SHA-256 of the configuration file, when loaded from one
    pub config_hash: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Page records written (fetched plus robots-blocked)
    pub pages_recorded: u64,

    /// Responses received, any status
    pub pages_fetched: u64,

    /// Responses that were not HTML and so yielded no links
    pub pages_non_html: u64,

    /// URLs denied by robots.txt
    pub urls_blocked: u64,

    /// Redirects not followed because the target was off-origin or disallowed
    pub redirects_refused: u64,

    /// Error records written
    pub errors: u64,

    /// Edge records written
    pub edges: u64,

    /// URLs added to the frontier from sitemaps
    pub sitemap_urls: u64,

    /// Distinct URLs admitted to the frontier
    pub urls_seen: u64,

    /// Whether the page budget stopped the frontier from growing
    pub page_limit_reached: bool,

    /// Responses per HTTP status code
    pub status_counts: BTreeMap<u16, u64>,

    /// Page records per depth
    pub depth_counts: BTreeMap<u32, u64>,

    /// Nodes in the written hierarchy, root included
    pub hierarchy_nodes: usize,

    /// Where the robots rules came from
    pub robots: Option<String>,

    pub robots_fetched_at: Option<DateTime<Utc>>,
}

impl CrawlStats {
    /// Starts an empty tally for a crawl of `seed_url`
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            config_hash: None,
            started_at: Utc::now(),
            finished_at: None,
            pages_recorded: 0,
            pages_fetched: 0,
            pages_non_html: 0,
            urls_blocked: 0,
            redirects_refused: 0,
            errors: 0,
            edges: 0,
            sitemap_urls: 0,
            urls_seen: 0,
            page_limit_reached: false,
            status_counts: BTreeMap::new(),
            depth_counts: BTreeMap::new(),
            hierarchy_nodes: 0,
            robots: None,
            robots_fetched_at: None,
        }
    }

    /// Tallies one written page record
    pub fn count_page(&mut self, status_code: Option<u16>, depth: u32) {
        self.pages_recorded += 1;
        *self.depth_counts.entry(depth).or_insert(0) += 1;
        if let Some(status) = status_code {
            self.pages_fetched += 1;
            *self.status_counts.entry(status).or_insert(0) += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, if the run finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Share of fetched responses with a 2xx status, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_fetched == 0 {
            return 0.0;
        }
        let ok: u64 = self
            .status_counts
            .range(200..300)
            .map(|(_, count)| count)
            .sum();
        (ok as f64 / self.pages_fetched as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Summary ===\n");

    println!("Run:");
    println!("  Seed: {}", stats.seed_url);
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(duration) = stats.duration_seconds() {
        println!("  Duration: {:.1}s", duration);
    }
    if let Some(hash) = &stats.config_hash {
        println!("  Config hash: {}", hash);
    }
    if let Some(robots) = &stats.robots {
        match stats.robots_fetched_at {
            Some(at) => println!("  robots.txt: {} at {}", robots, at.to_rfc3339()),
            None => println!("  robots.txt: {}", robots),
        }
    }
    println!();

    println!("Overview:");
    println!("  URLs admitted: {}", stats.urls_seen);
    println!("  Page records: {}", stats.pages_recorded);
    println!("  Responses: {}", stats.pages_fetched);
    println!("  Non-HTML responses: {}", stats.pages_non_html);
    println!("  Blocked by robots.txt: {}", stats.urls_blocked);
    if stats.redirects_refused > 0 {
        println!("  Redirects not followed: {}", stats.redirects_refused);
    }
    println!("  Errors: {}", stats.errors);
    println!("  Edges: {}", stats.edges);
    if stats.sitemap_urls > 0 {
        println!("  From sitemaps: {}", stats.sitemap_urls);
    }
    if stats.page_limit_reached {
        println!("  Page limit reached");
    }
    println!();

    if !stats.status_counts.is_empty() {
        println!("Responses by Status:");
        for (status, count) in &stats.status_counts {
            println!("  {}: {}", status, count);
        }
        println!();
    }

    if !stats.depth_counts.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.depth_counts {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    if stats.hierarchy_nodes > 0 {
        println!("Hierarchy nodes: {}", stats.hierarchy_nodes);
    }

    println!(
        "Success Rate: {:.1}% of {} responses",
        stats.success_rate(),
        stats.pages_fetched
    );
}
