use crate::config::types::{
    Config, CrawlerConfig, HierarchyConfig, OutputConfig, SitemapConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_sitemap_config(&config.sitemap)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_hierarchy_config(&config.hierarchy)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 (omit it for an unbounded crawl)".to_string(),
        ));
    }

    if !config.delay_secs.is_finite() || config.delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay_secs must be a non-negative number, got {}",
            config.delay_secs
        )));
    }

    if !config.timeout_secs.is_finite() || config.timeout_secs <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be a positive number, got {}",
            config.timeout_secs
        )));
    }

    if config.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "max_body_bytes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates sitemap configuration
fn validate_sitemap_config(config: &SitemapConfig) -> Result<(), ConfigError> {
    for sitemap in &config.urls {
        validate_http_url("sitemap url", sitemap)?;
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }

    if config.value.contains(['\r', '\n']) || config.accept_language.contains(['\r', '\n']) {
        return Err(ConfigError::Validation(
            "header values cannot contain line breaks".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("pages_path", &config.pages_path),
        ("edges_path", &config.edges_path),
        ("errors_path", &config.errors_path),
        ("hierarchy_path", &config.hierarchy_path),
    ];

    for (name, path) in paths {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    for (i, (name, path)) in paths.iter().enumerate() {
        if paths[i + 1..].iter().any(|(_, other)| other == path) {
            return Err(ConfigError::Validation(format!(
                "{} '{}' is shared with another output",
                name, path
            )));
        }
    }

    Ok(())
}

/// Validates hierarchy configuration
fn validate_hierarchy_config(config: &HierarchyConfig) -> Result<(), ConfigError> {
    validate_exclude_prefixes(&config.exclude_prefixes)
}

/// Requires every hierarchy exclusion to be an absolute path below the root
pub fn validate_exclude_prefixes(prefixes: &[String]) -> Result<(), ConfigError> {
    for prefix in prefixes {
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "exclude prefix must be a path like '/docs', got '{}'",
                prefix
            )));
        }
    }
    Ok(())
}

/// Parses a URL and requires an http(s) scheme with a host
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}
