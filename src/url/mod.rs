//! URL handling module for Site-Atlas
//!
//! This module provides URL canonicalization and the same-origin test that
//! defines the crawl boundary.

mod normalize;
mod origin;

// Re-export main functions
pub use normalize::{canonicalize, normalize_url};
pub use origin::Origin;

use ::url::Url;

/// Splits a URL path into its non-empty segments
///
/// # Examples
///
/// ```
/// use site_atlas::url::path_segments;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/a//b/c/").unwrap();
/// assert_eq!(path_segments(&url), vec!["a", "b", "c"]);
/// ```
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path().split('/').filter(|s| !s.is_empty()).collect()
}

/// Returns true if the URL path equals `prefix` or lies beneath it
///
/// Matching is segment-aware: `/s` covers `/s` and `/s/x` but not `/services`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Host label for reports: the host, with the port when one is explicit
pub fn host_label(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
