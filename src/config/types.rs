use serde::Deserialize;

/// Browser-like user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for Site-Atlas
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URL; its scheme and host define the crawl origin
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of distinct URLs admitted to the frontier (absent = unbounded)
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u64>,

    /// Maximum depth to crawl from the seed URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Minimum time between the starts of consecutive requests (seconds)
    #[serde(rename = "delay-secs", default = "default_delay_secs")]
    pub delay_secs: f64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Verify TLS certificates
    #[serde(rename = "verify-tls", default = "default_true")]
    pub verify_tls: bool,

    /// Respect robots.txt; disable only for debugging
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,

    /// Emit a page record (with no status) for URLs denied by robots.txt
    #[serde(rename = "record-blocked-urls", default)]
    pub record_blocked_urls: bool,

    /// Maximum redirect hops followed per request (0 = never follow)
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Largest HTML body read per page (bytes); longer bodies are truncated
    #[serde(rename = "max-body-bytes", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

/// Sitemap seeding configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitemapConfig {
    /// Seed the frontier from sitemaps before organic discovery
    #[serde(default)]
    pub enabled: bool,

    /// Sitemap URLs; when empty, robots.txt `Sitemap:` lines or `/sitemap.xml` are used
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Request identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// User-Agent header value, also used for robots.txt matching
    #[serde(default = "default_user_agent")]
    pub value: String,

    /// Accept-Language header value
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Page records, one JSON object per line
    #[serde(rename = "pages-path", default = "default_pages_path")]
    pub pages_path: String,

    /// Edge records, one JSON object per line
    #[serde(rename = "edges-path", default = "default_edges_path")]
    pub edges_path: String,

    /// Error records, one JSON object per line
    #[serde(rename = "errors-path", default = "default_errors_path")]
    pub errors_path: String,

    /// Path-segment hierarchy, a single JSON document
    #[serde(rename = "hierarchy-path", default = "default_hierarchy_path")]
    pub hierarchy_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pages_path: default_pages_path(),
            edges_path: default_edges_path(),
            errors_path: default_errors_path(),
            hierarchy_path: default_hierarchy_path(),
        }
    }
}

/// Hierarchy derivation configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HierarchyConfig {
    /// Path prefixes (e.g. "/wps") whose pages are left out of the hierarchy
    #[serde(rename = "exclude-prefixes", default)]
    pub exclude_prefixes: Vec<String>,
}

fn default_max_depth() -> u32 {
    8
}

fn default_delay_secs() -> f64 {
    0.5
}

fn default_timeout_secs() -> f64 {
    20.0
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_pages_path() -> String {
    "data/pages.jsonl".to_string()
}

fn default_edges_path() -> String {
    "data/edges.jsonl".to_string()
}

fn default_errors_path() -> String {
    "data/errors.jsonl".to_string()
}

fn default_hierarchy_path() -> String {
    "data/hierarchy.json".to_string()
}

impl CrawlerConfig {
    /// Builds a crawler section with defaults for everything but the seed
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_pages: None,
            max_depth: default_max_depth(),
            delay_secs: default_delay_secs(),
            timeout_secs: default_timeout_secs(),
            verify_tls: true,
            obey_robots: true,
            record_blocked_urls: false,
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
            debug: false,
        }
    }
}

impl Config {
    /// Builds a configuration with defaults for everything but the seed
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            crawler: CrawlerConfig::with_base_url(base_url),
            sitemap: SitemapConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
            hierarchy: HierarchyConfig::default(),
        }
    }
}
