//! Records written to the output streams
//!
//! Optional fields serialize as JSON `null`; there are no placeholder strings.

use serde::{Deserialize, Serialize};

/// One processed (fetched or robots-blocked) URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical URL as dequeued; unique across a run
    pub url: String,

    /// HTTP status of the final response (None when blocked by robots.txt)
    pub status_code: Option<u16>,

    pub title: Option<String>,

    pub meta_description: Option<String>,

    /// Absolute `<link rel="canonical">` target
    pub canonical: Option<String>,

    /// Page on which the URL was discovered (None for the seed)
    pub parent_url: Option<String>,

    /// Link hops from the seed
    pub depth: u32,

    /// Landing URL when redirects led somewhere other than `url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
}

impl PageRecord {
    /// A record for a URL that robots.txt denied; nothing was fetched
    pub fn blocked(url: &str, parent_url: Option<&str>, depth: u32) -> Self {
        Self {
            url: url.to_string(),
            status_code: None,
            title: None,
            meta_description: None,
            canonical: None,
            parent_url: parent_url.map(str::to_string),
            depth,
            final_url: None,
        }
    }
}

/// A same-origin hyperlink found on a fetched page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
}

/// A URL that produced no page record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,

    /// `<kind>: <detail>`, kind being network, timeout, tls or robots
    pub error: String,

    pub parent_url: Option<String>,

    pub depth: u32,
}
