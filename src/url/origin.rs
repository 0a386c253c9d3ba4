use crate::UrlError;
use url::Url;

/// The crawl boundary: a scheme and host pair
///
/// Links outside the origin are recorded nowhere and never fetched. Ports are not
/// part of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
}

impl Origin {
    /// Extracts the origin of a URL
    ///
    /// # Examples
    ///
    /// ```
    /// use site_atlas::url::Origin;
    /// use url::Url;
    ///
    /// let origin = Origin::from_url(&Url::parse("https://Example.com/a").unwrap()).unwrap();
    /// assert_eq!(origin.host(), "example.com");
    /// assert!(origin.is_same_origin(&Url::parse("https://EXAMPLE.COM/b").unwrap()));
    /// assert!(!origin.is_same_origin(&Url::parse("http://example.com/b").unwrap()));
    /// ```
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        let host = url.host_str().ok_or(UrlError::MissingHost)?;
        Ok(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
        })
    }

    /// Returns true iff the URL has this origin's scheme and host
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme().eq_ignore_ascii_case(&self.scheme)
            && url
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(&self.host))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The robots.txt location for this origin, keeping the seed's port
    pub fn robots_url(&self, seed: &Url) -> Result<Url, UrlError> {
        seed.join("/robots.txt")
            .map_err(|e| UrlError::Parse(e.to_string()))
    }
}
