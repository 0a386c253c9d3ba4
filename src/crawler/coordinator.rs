//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading the robots policy and seeding the frontier
//! - Coordinating fetching, extraction and link discovery
//! - Streaming page, edge and error records
//! - Writing the hierarchy and tallying the run summary

use crate::config::{validate, Config};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Admission, Frontier, FrontierEntry};
use crate::crawler::parser::{extract, PageMeta};
use crate::crawler::sitemap::{collect_sitemap_urls, sitemap_sources};
use crate::output::{
    write_hierarchy, CrawlStats, EdgeRecord, ErrorRecord, HierarchyBuilder, JsonlOutput,
    OutputHandler, PageRecord, PathFilter,
};
use crate::robots::RobotsPolicy;
use crate::url::{canonicalize, host_label, Origin};
use crate::Result;
use std::time::Instant;
use url::Url;

/// Error text recorded for URLs denied by robots.txt
const ROBOTS_DENIED: &str = "robots: disallowed by robots.txt";

/// Main crawler coordinator structure
///
/// Owns every piece of mutable crawl state: the frontier, the output streams and
/// the hierarchy under construction. One request is in flight at a time.
pub struct Coordinator<O = JsonlOutput> {
    config: Config,
    seed: Url,
    origin: Origin,
    fetcher: Fetcher,
    frontier: Frontier,
    output: O,
    hierarchy: HierarchyBuilder,
    stats: CrawlStats,
}

impl Coordinator<JsonlOutput> {
    /// Creates a coordinator writing to the JSON-lines streams of `config.output`
    ///
    /// The configuration is validated before any output file is touched.
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let output = JsonlOutput::create(&config.output)?;
        Self::build(config, output)
    }
}

impl<O: OutputHandler> Coordinator<O> {
    /// Creates a coordinator writing to a caller-supplied output handler
    pub fn with_output(config: Config, output: O) -> Result<Self> {
        validate(&config)?;
        Self::build(config, output)
    }

    fn build(config: Config, output: O) -> Result<Self> {
        let seed = canonicalize(&config.crawler.base_url)?;
        let origin = Origin::from_url(&seed)?;
        let fetcher = Fetcher::new(&config)?;
        let frontier = Frontier::new(config.crawler.max_depth, config.crawler.max_pages);
        let filter = PathFilter::new(config.hierarchy.exclude_prefixes.iter().cloned());
        let hierarchy = HierarchyBuilder::with_filter(host_label(&seed), filter);
        let stats = CrawlStats::new(seed.as_str());

        Ok(Self {
            config,
            seed,
            origin,
            fetcher,
            frontier,
            output,
            hierarchy,
            stats,
        })
    }

    /// Attaches the configuration file hash to the run summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.stats.config_hash = Some(hash.into());
        self
    }

    /// Runs the crawl to completion
    ///
    /// 1. Loads robots.txt (or bypasses it)
    /// 2. Seeds the frontier with the base URL, then sitemap URLs
    /// 3. Processes entries in FIFO order until the frontier is empty
    /// 4. Closes the streams and writes the hierarchy
    ///
    /// Output I/O errors abort the run; fetch failures never do.
    pub async fn run(mut self) -> Result<CrawlStats> {
        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {})",
            self.seed,
            self.config.crawler.max_depth,
            self.config
                .crawler
                .max_pages
                .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
        );

        let robots = self.load_robots().await?;
        self.note_robots(&robots);

        self.frontier.offer(self.seed.as_str(), None, 0);
        if self.config.sitemap.enabled {
            self.seed_from_sitemaps(&robots).await;
        }

        let start_time = Instant::now();
        let mut processed: u64 = 0;

        while let Some(entry) = self.frontier.pop() {
            tracing::debug!(
                "Dequeued url={} depth={} parent={}",
                entry.url,
                entry.depth,
                entry.parent_url.as_deref().unwrap_or("-")
            );

            self.process_entry(&robots, entry).await?;
            processed += 1;

            if processed % 10 == 0 {
                let rate = processed as f64 / start_time.elapsed().as_secs_f64().max(1e-9);
                tracing::info!(
                    "Progress: {} URLs processed, {} in frontier, {:.2} URLs/sec",
                    processed,
                    self.frontier.len(),
                    rate
                );
            }
        }

        tracing::info!("Frontier is empty, crawl complete");
        self.output.finalize()?;

        let root = self.hierarchy.build();
        write_hierarchy(&root, &self.config.output.hierarchy_path)?;

        let mut stats = self.stats;
        stats.urls_seen = self.frontier.seen_count() as u64;
        stats.hierarchy_nodes = root.node_count();
        stats.finish();

        tracing::info!(
            "Crawl finished: {} pages, {} edges, {} errors in {:.1}s",
            stats.pages_recorded,
            stats.edges,
            stats.errors,
            stats.duration_seconds().unwrap_or_default()
        );

        Ok(stats)
    }

    async fn load_robots(&mut self) -> Result<RobotsPolicy> {
        let user_agent = self.config.user_agent.value.clone();
        if !self.config.crawler.obey_robots {
            return Ok(RobotsPolicy::bypassed(&user_agent));
        }

        let robots_url = self.origin.robots_url(&self.seed)?;
        Ok(RobotsPolicy::load(&mut self.fetcher, &robots_url, &user_agent).await)
    }

    fn note_robots(&mut self, robots: &RobotsPolicy) {
        self.stats.robots = Some(robots.source().to_string());
        self.stats.robots_fetched_at = robots.fetched_at();
    }

    /// Offers same-origin sitemap URLs at depth 1, after the seed
    async fn seed_from_sitemaps(&mut self, robots: &RobotsPolicy) {
        let sources = sitemap_sources(&self.config.sitemap, robots, &self.seed);
        let urls = collect_sitemap_urls(&mut self.fetcher, sources, &self.origin).await;

        let seed = self.seed.to_string();
        for url in urls {
            match self.frontier.offer(&url, Some(&seed), 1) {
                Admission::Queued => {
                    self.stats.sitemap_urls += 1;
                    tracing::debug!("Seed sitemap: {}", url);
                }
                Admission::PageLimitReached => self.stats.page_limit_reached = true,
                Admission::AlreadySeen | Admission::DepthExceeded => {}
            }
        }
    }

    /// Processes a single frontier entry
    ///
    /// Every entry ends in exactly one record: a page record, or an error record
    /// when the fetch failed (or robots.txt denied it and blocked URLs are not
    /// recorded as pages).
    async fn process_entry(&mut self, robots: &RobotsPolicy, entry: FrontierEntry) -> Result<()> {
        let url = canonicalize(&entry.url)?;

        // Check robots.txt
        if !robots.is_allowed(&url) {
            tracing::info!("Blocked by robots.txt: {}", url);
            self.stats.urls_blocked += 1;

            if self.config.crawler.record_blocked_urls {
                let record = PageRecord::blocked(&entry.url, entry.parent_url.as_deref(), entry.depth);
                self.write_page(&record)?;
            } else {
                self.write_error(&entry, ROBOTS_DENIED.to_string())?;
            }
            return Ok(());
        }

        // Fetch the page; redirect hops must stay on the origin and pass robots.txt
        let origin = &self.origin;
        let fetched = self
            .fetcher
            .fetch_page(&url, |hop| origin.is_same_origin(hop) && robots.is_allowed(hop))
            .await;
        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Fetch failed for {}: {}", url, e);
                return self.write_error(&entry, e.to_string());
            }
        };

        let meta = if response.refused_redirect.is_some() {
            self.stats.redirects_refused += 1;
            PageMeta::default()
        } else if response.is_html() {
            extract(&response.body, &response.final_url)
        } else {
            tracing::debug!(
                "Not HTML ({}): {}",
                response.content_type.as_deref().unwrap_or("no content type"),
                url
            );
            self.stats.pages_non_html += 1;
            PageMeta::default()
        };

        let landing = response
            .refused_redirect
            .as_ref()
            .unwrap_or(&response.final_url);
        let final_url = (landing.as_str() != entry.url).then(|| landing.to_string());
        if let Some(landing) = &final_url {
            tracing::debug!("{} redirected to {}", entry.url, landing);
        }

        let record = PageRecord {
            url: entry.url.clone(),
            status_code: Some(response.status),
            title: meta.title,
            meta_description: meta.meta_description,
            canonical: meta.canonical,
            parent_url: entry.parent_url.clone(),
            depth: entry.depth,
            final_url,
        };
        self.write_page(&record)?;
        self.hierarchy.insert_url(&entry.url);

        // Follow same-origin links
        for link in &meta.links {
            let Ok(target) = Url::parse(link) else {
                continue;
            };
            if !self.origin.is_same_origin(&target) {
                tracing::trace!("Skipping off-origin link {}", link);
                continue;
            }

            self.output.record_edge(&EdgeRecord {
                source: entry.url.clone(),
                target: link.clone(),
            })?;
            self.stats.edges += 1;

            if self.frontier.offer(link, Some(&entry.url), entry.depth + 1)
                == Admission::PageLimitReached
            {
                self.stats.page_limit_reached = true;
            }
        }

        Ok(())
    }

    fn write_page(&mut self, record: &PageRecord) -> Result<()> {
        self.output.record_page(record)?;
        self.stats.count_page(record.status_code, record.depth);
        Ok(())
    }

    fn write_error(&mut self, entry: &FrontierEntry, error: String) -> Result<()> {
        self.output.record_error(&ErrorRecord {
            url: entry.url.clone(),
            error,
            parent_url: entry.parent_url.clone(),
            depth: entry.depth,
        })?;
        self.stats.errors += 1;
        Ok(())
    }
}

/// Runs a complete crawl with JSON-lines output
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlStats)` - Crawl completed; all artifacts are written
/// * `Err(AtlasError)` - Invalid configuration or an output failure
pub async fn run_crawl(config: Config) -> Result<CrawlStats> {
    Coordinator::new(config)?.run().await
}
