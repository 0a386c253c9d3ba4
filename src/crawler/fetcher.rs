//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one persistent HTTP client with browser-like headers
//! - Enforcing the politeness delay between consecutive requests
//! - Following redirects hop by hop, so every hop can be vetted before it is requested
//! - Capped body reads (non-HTML page bodies are never read)
//! - Error classification (network, timeout, TLS)
//!
//! Requests are never retried; a failed fetch is terminal for its URL.

use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Connection refused, DNS failure, reset, body read failure, redirect loop
    Network,
    /// The request exceeded the configured timeout
    Timeout,
    /// Certificate or handshake failure
    Tls,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Tls => "tls",
        };
        f.write_str(name)
    }
}

/// A terminal fetch failure
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    /// Classifies a reqwest error from its source chain
    ///
    /// The request URL is stripped first so a path like `/ssl-help` cannot
    /// masquerade as a TLS failure.
    fn from_reqwest(error: reqwest::Error) -> Self {
        let error = error.without_url();
        let kind = if error.is_timeout() {
            FetchErrorKind::Timeout
        } else if is_tls_failure(&error) {
            FetchErrorKind::Tls
        } else {
            FetchErrorKind::Network
        };
        Self {
            kind,
            detail: error_chain(&error),
        }
    }

    fn too_many_redirects(start: &Url, hops: usize) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            detail: format!("too many redirects ({} hops from {})", hops, start),
        }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code of the final response
    pub status: u16,
    /// URL of the final response, after any followed redirects
    pub final_url: Url,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response body decoded as text (empty when it was not read)
    pub body: String,
    /// Redirect target that was refused, leaving the 3xx as the final response
    pub refused_redirect: Option<Url>,
}

impl FetchResponse {
    /// Returns true if the Content-Type announces HTML or XHTML
    pub fn is_html(&self) -> bool {
        is_html_content_type(self.content_type.as_deref())
    }
}

fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.contains("text/html") || ct.contains("application/xhtml")
    })
}

/// Which response bodies a request reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyPolicy {
    Any,
    HtmlOnly,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed by the client; [`Fetcher`] walks them itself.
///
/// # Example
///
/// ```no_run
/// use site_atlas::config::Config;
/// use site_atlas::crawler::build_http_client;
///
/// let config = Config::with_base_url("https://example.com/");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    if let Ok(language) = HeaderValue::from_str(&config.user_agent.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    let timeout = Duration::from_secs_f64(config.crawler.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.value.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(!config.crawler.verify_tls)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sequential, politeness-delayed HTTP fetcher
///
/// One instance is shared by robots.txt loading, sitemap seeding and the crawl
/// itself, so the delay holds across all of them, redirect hops included.
pub struct Fetcher {
    client: Client,
    delay: Duration,
    max_redirects: usize,
    max_body_bytes: usize,
    last_request: Option<Instant>,
}

impl Fetcher {
    /// Creates a fetcher from the crawl configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            delay: Duration::from_secs_f64(config.crawler.delay_secs),
            max_redirects: config.crawler.max_redirects,
            max_body_bytes: config.crawler.max_body_bytes,
            last_request: None,
        })
    }

    /// Fetches a resource (robots.txt, sitemaps), following any redirect
    /// and reading the body whatever its type
    pub async fn fetch(&mut self, url: &Url) -> Result<FetchResponse, FetchError> {
        self.fetch_with(url, |_| true, BodyPolicy::Any).await
    }

    /// Fetches a crawl page
    ///
    /// # Request Flow
    ///
    /// 1. Wait until `delay` has elapsed since the previous request started
    /// 2. Send GET
    /// 3. On a redirect, request the target only if `follow` accepts it, at
    ///    most `max-redirects` times (each hop waits out the delay too)
    /// 4. Read the body if the final response is HTML, up to `max-body-bytes`
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | Any HTTP status | `Ok`, status recorded as-is |
    /// | Redirect refused by `follow` | `Ok`, the 3xx with `refused_redirect` set |
    /// | Redirect chain longer than `max-redirects` | `FetchErrorKind::Network` |
    /// | Timeout (connect, headers or body) | `FetchErrorKind::Timeout` |
    /// | Certificate / handshake failure | `FetchErrorKind::Tls` |
    /// | Anything else | `FetchErrorKind::Network` |
    pub async fn fetch_page<F>(&mut self, url: &Url, follow: F) -> Result<FetchResponse, FetchError>
    where
        F: Fn(&Url) -> bool,
    {
        self.fetch_with(url, follow, BodyPolicy::HtmlOnly).await
    }

    async fn fetch_with<F>(
        &mut self,
        url: &Url,
        follow: F,
        bodies: BodyPolicy,
    ) -> Result<FetchResponse, FetchError>
    where
        F: Fn(&Url) -> bool,
    {
        let mut current = url.clone();
        let mut hops = 0;

        loop {
            self.wait_politely().await;

            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(FetchError::from_reqwest)?;

            let Some(next) = redirect_target(&response) else {
                return self.read_response(response, None, bodies).await;
            };

            if hops == self.max_redirects {
                if self.max_redirects == 0 {
                    return self.read_response(response, None, bodies).await;
                }
                return Err(FetchError::too_many_redirects(url, hops));
            }

            if !follow(&next) {
                tracing::info!("Not following redirect {} -> {}", current, next);
                return self.read_response(response, Some(next), bodies).await;
            }

            tracing::debug!("Redirect {} -> {}", current, next);
            hops += 1;
            current = next;
        }
    }

    async fn read_response(
        &self,
        response: Response,
        refused_redirect: Option<Url>,
        bodies: BodyPolicy,
    ) -> Result<FetchResponse, FetchError> {
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        tracing::debug!(
            "GET {} -> {} {}",
            final_url,
            status,
            content_type.as_deref().unwrap_or("")
        );

        let read = match bodies {
            BodyPolicy::Any => true,
            BodyPolicy::HtmlOnly => {
                refused_redirect.is_none() && is_html_content_type(content_type.as_deref())
            }
        };
        let body = if read {
            self.read_body(response).await?
        } else {
            String::new()
        };

        Ok(FetchResponse {
            status,
            final_url,
            content_type,
            body,
            refused_redirect,
        })
    }

    /// Reads at most `max_body_bytes` of the body, chunk by chunk
    async fn read_body(&self, mut response: Response) -> Result<String, FetchError> {
        let mut body: Vec<u8> = Vec::new();

        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                tracing::warn!(
                    "Body of {} exceeds {} bytes, truncated",
                    response.url(),
                    self.max_body_bytes
                );
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn wait_politely(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                let wait_time = self.delay - elapsed;
                tracing::trace!("Politeness delay: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// The absolute http(s) target of a redirect response, fragment dropped
fn redirect_target(response: &Response) -> Option<Url> {
    let status = response.status();
    if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let mut target = response.url().join(location).ok()?;
    target.set_fragment(None);
    matches!(target.scheme(), "http" | "https").then_some(target)
}

/// Joins an error and its sources into one line
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Looks for a TLS failure among the causes of `error`
fn is_tls_failure(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if looks_like_tls(&cause.to_string()) {
            return true;
        }
        source = cause.source();
    }
    false
}

fn looks_like_tls(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| detail.contains(needle))
}
