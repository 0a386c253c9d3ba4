//! Sitemap seeding
//!
//! Supports:
//! - Standard `<urlset>` sitemaps
//! - Sitemap index files (`<sitemapindex>`), followed up to a fixed number of documents
//!
//! Parsing is a plain scan for `<loc>` elements; sitemaps that fail to download or
//! parse are logged and skipped, never fatal.

use crate::config::SitemapConfig;
use crate::crawler::fetcher::Fetcher;
use crate::robots::RobotsPolicy;
use crate::url::{canonicalize, Origin};
use std::collections::{BTreeSet, HashSet, VecDeque};
use url::Url;

/// Maximum sitemap documents fetched in one run, indexes included
pub const MAX_SITEMAPS: usize = 50;

/// The `<loc>` entries of one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// Page URLs
    UrlSet(Vec<String>),
    /// Further sitemap URLs
    Index(Vec<String>),
}

/// Decides which sitemaps to read
///
/// Configured URLs win; otherwise the robots.txt `Sitemap:` lines; otherwise
/// `/sitemap.xml` on the seed's host.
pub fn sitemap_sources(config: &SitemapConfig, robots: &RobotsPolicy, seed: &Url) -> Vec<Url> {
    let configured: Vec<Url> = config
        .urls
        .iter()
        .filter_map(|raw| Url::parse(raw).ok())
        .collect();
    if !configured.is_empty() {
        return configured;
    }

    let advertised: Vec<Url> = robots
        .sitemaps()
        .iter()
        .filter_map(|raw| Url::parse(raw).ok())
        .collect();
    if !advertised.is_empty() {
        return advertised;
    }

    seed.join("/sitemap.xml").into_iter().collect()
}

/// Parses the `<loc>` entries of a sitemap document
pub fn parse_sitemap(content: &str) -> SitemapDocument {
    if content.contains("<sitemapindex") {
        SitemapDocument::Index(block_locs(content, "sitemap"))
    } else {
        SitemapDocument::UrlSet(block_locs(content, "url"))
    }
}

/// Fetches the sitemaps and returns their same-origin page URLs, canonical and sorted
pub async fn collect_sitemap_urls(
    fetcher: &mut Fetcher,
    sources: Vec<Url>,
    origin: &Origin,
) -> Vec<String> {
    let mut pending: VecDeque<Url> = sources.into_iter().collect();
    let mut fetched: HashSet<Url> = HashSet::new();
    let mut urls = BTreeSet::new();
    let mut skipped_foreign = 0usize;

    while let Some(sitemap_url) = pending.pop_front() {
        if fetched.len() >= MAX_SITEMAPS {
            tracing::warn!("Reached max sitemap limit ({}), stopping", MAX_SITEMAPS);
            break;
        }
        if !fetched.insert(sitemap_url.clone()) {
            continue;
        }

        let response = match fetcher.fetch(&sitemap_url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Sitemap error {}: {}", sitemap_url, e);
                continue;
            }
        };

        tracing::info!("Sitemap GET {} -> {}", sitemap_url, response.status);
        if !(200..300).contains(&response.status) {
            continue;
        }

        match parse_sitemap(&response.body) {
            SitemapDocument::Index(children) => {
                tracing::debug!(
                    "Sitemap index {} lists {} sitemaps",
                    sitemap_url,
                    children.len()
                );
                pending.extend(children.iter().filter_map(|loc| Url::parse(loc).ok()));
            }
            SitemapDocument::UrlSet(locs) => {
                for loc in locs {
                    match canonicalize(&loc) {
                        Ok(url) if origin.is_same_origin(&url) => {
                            urls.insert(String::from(url));
                        }
                        Ok(_) => skipped_foreign += 1,
                        Err(e) => tracing::debug!("Skipping sitemap entry {}: {}", loc, e),
                    }
                }
            }
        }
    }

    if skipped_foreign > 0 {
        tracing::debug!("Ignored {} off-origin sitemap entries", skipped_foreign);
    }
    tracing::info!(
        "Sitemap URLs on origin: {} (from {} sitemaps)",
        urls.len(),
        fetched.len()
    );

    urls.into_iter().collect()
}

/// Collects the `<loc>` of every `<block>` element
fn block_locs(content: &str, block: &str) -> Vec<String> {
    let open = format!("<{}>", block);
    let close = format!("</{}>", block);

    content
        .split(open.as_str())
        .skip(1)
        .filter_map(|rest| rest.find(close.as_str()).map(|end| &rest[..end]))
        .filter_map(|element| extract_tag(element, "loc"))
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Extracts the trimmed text of the first `<tag>` element, unescaping the XML entities
fn extract_tag(content: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    let value_start = content.find(&start_tag)? + start_tag.len();
    let end = content[value_start..].find(&end_tag)?;
    let text = content[value_start..value_start + end].trim();

    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);

    Some(unescape_xml(text.trim()))
}

/// Decodes the five predefined XML entities; `&amp;` last so `&amp;lt;` stays `&lt;`
fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
