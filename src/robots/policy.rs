//! The single-origin robots policy used by the crawl driver
//!
//! robots.txt is fetched once, on first use, and kept for the whole run.

use crate::crawler::Fetcher;
use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Where the active rules came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsSource {
    /// robots.txt was fetched and parsed
    Fetched { status: u16 },
    /// The origin has no robots.txt (4xx); everything is allowed
    Missing { status: u16 },
    /// robots.txt could not be retrieved; degraded to allow-all
    Unavailable { reason: String },
    /// Robots handling is disabled by configuration
    Bypassed,
}

impl fmt::Display for RobotsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetched { status } => write!(f, "fetched (HTTP {})", status),
            Self::Missing { status } => write!(f, "missing (HTTP {})", status),
            Self::Unavailable { reason } => write!(f, "unavailable ({}), allowing all", reason),
            Self::Bypassed => f.write_str("ignored by configuration"),
        }
    }
}

/// Allow/deny oracle for one origin
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    rules: ParsedRobots,
    source: RobotsSource,
    user_agent: String,
    fetched_at: Option<DateTime<Utc>>,
}

impl RobotsPolicy {
    /// Fetches and parses `robots_url`
    ///
    /// Never fails: a 4xx means no restrictions, and a 5xx or network error degrades
    /// to allow-all with a warning rather than blocking the crawl.
    pub async fn load(fetcher: &mut Fetcher, robots_url: &Url, user_agent: &str) -> Self {
        let fetched_at = Some(Utc::now());
        let (rules, source) = match fetcher.fetch(robots_url).await {
            Ok(response) if (200..300).contains(&response.status) => {
                tracing::info!("robots.txt read: {} ({})", robots_url, response.status);
                (
                    ParsedRobots::from_content(&response.body),
                    RobotsSource::Fetched {
                        status: response.status,
                    },
                )
            }
            Ok(response) if (400..500).contains(&response.status) => {
                tracing::info!(
                    "No robots.txt at {} ({}), allowing all",
                    robots_url,
                    response.status
                );
                (
                    ParsedRobots::allow_all(),
                    RobotsSource::Missing {
                        status: response.status,
                    },
                )
            }
            Ok(response) => {
                let reason = format!("HTTP {}", response.status);
                tracing::warn!(
                    "robots.txt unavailable at {} ({}), allowing all URLs",
                    robots_url,
                    reason
                );
                (ParsedRobots::allow_all(), RobotsSource::Unavailable { reason })
            }
            Err(e) => {
                tracing::warn!(
                    "robots.txt unavailable at {} ({}), allowing all URLs",
                    robots_url,
                    e
                );
                (
                    ParsedRobots::allow_all(),
                    RobotsSource::Unavailable {
                        reason: e.to_string(),
                    },
                )
            }
        };

        Self {
            rules,
            source,
            user_agent: user_agent.to_string(),
            fetched_at,
        }
    }

    /// A policy that allows everything without fetching robots.txt
    pub fn bypassed(user_agent: &str) -> Self {
        tracing::warn!("robots.txt is being ignored (obey-robots = false)");
        Self {
            rules: ParsedRobots::allow_all(),
            source: RobotsSource::Bypassed,
            user_agent: user_agent.to_string(),
            fetched_at: None,
        }
    }

    /// Builds a policy from already-known robots.txt content
    #[cfg(test)]
    pub fn from_content(content: &str, user_agent: &str) -> Self {
        Self {
            rules: ParsedRobots::from_content(content),
            source: RobotsSource::Fetched { status: 200 },
            user_agent: user_agent.to_string(),
            fetched_at: Some(Utc::now()),
        }
    }

    /// Checks whether the URL may be fetched
    pub fn is_allowed(&self, url: &Url) -> bool {
        let allowed = self.rules.is_allowed(url.as_str(), &self.user_agent);
        if !allowed {
            tracing::debug!("robots.txt disallows {}", url);
        }
        allowed
    }

    /// `Sitemap:` directives of the fetched file
    pub fn sitemaps(&self) -> Vec<String> {
        self.rules.sitemaps()
    }

    /// Provenance of the active rules, reported in the run summary
    pub fn source(&self) -> &RobotsSource {
        &self.source
    }

    /// When robots.txt was requested (None when bypassed)
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}
