//! HTML extractor for page metadata and outbound links
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Meta description
//! - Canonical URL
//! - Hyperlinks to follow
//!
//! html5ever recovers from any markup, so extraction never fails: whatever cannot
//! be found is simply absent.

use crate::url::normalize_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// The meta description (name="description", falling back to og:description)
    pub meta_description: Option<String>,

    /// The canonical URL (from <link rel="canonical">), made absolute
    pub canonical: Option<String>,

    /// Distinct absolute URLs of the page's hyperlinks, fragments removed
    pub links: BTreeSet<String>,
}

/// Parses HTML content and extracts metadata and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<link>`, `<script>`, `<img>` and other non-anchor references
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
///
/// Links are not filtered by origin here; that is the crawl driver's job.
///
/// # Example
///
/// ```
/// use site_atlas::crawler::extract;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#x">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let meta = extract(html, &base_url);
/// assert_eq!(meta.title, Some("Test".to_string()));
/// assert!(meta.links.contains("https://example.com/page"));
/// ```
pub fn extract(html: &str, base_url: &Url) -> PageMeta {
    let document = Html::parse_document(html);

    PageMeta {
        title: extract_title(&document),
        meta_description: extract_description(&document),
        canonical: extract_canonical(&document, base_url),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .and_then(|element| non_empty(&element.text().collect::<String>()))
}

/// Extracts the meta description, preferring `name` over Open Graph `property`
fn extract_description(document: &Html) -> Option<String> {
    let meta_selector = Selector::parse("meta[content]").ok()?;
    let metas: Vec<ElementRef> = document.select(&meta_selector).collect();

    let by_attr = |attr: &str, value: &str| {
        metas
            .iter()
            .filter(|element| {
                element
                    .value()
                    .attr(attr)
                    .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
            })
            .find_map(|element| element.value().attr("content").and_then(non_empty))
    };

    by_attr("name", "description").or_else(|| by_attr("property", "og:description"))
}

/// Extracts the first `<link rel="canonical">` href, resolved against the base URL
fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let link_selector = Selector::parse("link[rel][href]").ok()?;

    document
        .select(&link_selector)
        .filter(|element| {
            element.value().attr("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("canonical"))
            })
        })
        .find_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            normalize_url(base_url, href).ok().map(String::from)
        })
}

/// Extracts all followable hyperlinks from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.insert(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to a canonical absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    normalize_url(base_url, href).ok().map(String::from)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
