use crate::UrlError;
use url::Url;

/// Resolves a possibly-relative href against a base URL into canonical form
///
/// # Normalization Steps
///
/// 1. Resolve `href` against `base` (WHATWG rules: lowercase host, default port
///    elided, dot segments removed, empty path becomes `/`)
/// 2. Reject anything that is not http or https
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// Nothing else is rewritten: query strings keep their order, trailing slashes and
/// path case are preserved, so `/a` and `/a/` are distinct pages.
///
/// # Examples
///
/// ```
/// use site_atlas::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let url = normalize_url(&base, "intro?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/intro?b=2&a=1");
/// ```
pub fn normalize_url(base: &Url, href: &str) -> Result<Url, UrlError> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{} ({})", href, e)))?;
    finish(url)
}

/// Canonicalizes an absolute URL string with the same policy as [`normalize_url`]
///
/// Applying it to its own output returns the identical string.
pub fn canonicalize(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(format!("{} ({})", url_str, e)))?;
    finish(url)
}

fn finish(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}
