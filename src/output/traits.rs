//! Output handler trait and the JSON-lines implementation
//!
//! The crawl driver talks to its sinks through [`OutputHandler`] only, so every
//! record reaches its stream as soon as it is produced.

use crate::config::OutputConfig;
use crate::output::records::{EdgeRecord, ErrorRecord, PageRecord};
use crate::output::writer::JsonlWriter;
use crate::Result;

/// Trait for output handlers
///
/// Output handlers receive crawl records one at a time, in the order the
/// crawler produces them.
pub trait OutputHandler {
    /// Records a processed page (fetched or robots-blocked)
    fn record_page(&mut self, page: &PageRecord) -> Result<()>;

    /// Records a same-origin link between two pages
    fn record_edge(&mut self, edge: &EdgeRecord) -> Result<()>;

    /// Records a URL that failed without producing a page
    fn record_error(&mut self, error: &ErrorRecord) -> Result<()>;

    /// Flushes and closes every stream
    fn finalize(&mut self) -> Result<()>;
}

/// Three append-only JSON-lines streams: pages, edges and errors
#[derive(Debug)]
pub struct JsonlOutput {
    pages: JsonlWriter<PageRecord>,
    edges: JsonlWriter<EdgeRecord>,
    errors: JsonlWriter<ErrorRecord>,
}

impl JsonlOutput {
    /// Creates (truncating) the three streams named in the configuration
    pub fn create(config: &OutputConfig) -> Result<Self> {
        let output = Self {
            pages: JsonlWriter::create(&config.pages_path)?,
            edges: JsonlWriter::create(&config.edges_path)?,
            errors: JsonlWriter::create(&config.errors_path)?,
        };

        tracing::debug!(
            "Writing pages to {}, edges to {}, errors to {}",
            config.pages_path,
            config.edges_path,
            config.errors_path
        );

        Ok(output)
    }
}

impl OutputHandler for JsonlOutput {
    fn record_page(&mut self, page: &PageRecord) -> Result<()> {
        self.pages.append(page)
    }

    fn record_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        self.edges.append(edge)
    }

    fn record_error(&mut self, error: &ErrorRecord) -> Result<()> {
        self.errors.append(error)
    }

    fn finalize(&mut self) -> Result<()> {
        self.pages.finish()?;
        self.edges.finish()?;
        self.errors.finish()?;

        tracing::info!(
            "Streams closed: {} pages, {} edges, {} errors",
            self.pages.records(),
            self.edges.records(),
            self.errors.records()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn output_config(dir: &std::path::Path) -> OutputConfig {
        let path = |name: &str| dir.join(name).display().to_string();
        OutputConfig {
            pages_path: path("pages.jsonl"),
            edges_path: path("edges.jsonl"),
            errors_path: path("errors.jsonl"),
            hierarchy_path: path("hierarchy.json"),
        }
    }

    #[test]
    fn test_records_go_to_their_streams() {
        let dir = tempdir().unwrap();
        let config = output_config(dir.path());
        let mut output = JsonlOutput::create(&config).unwrap();

        output
            .record_page(&PageRecord::blocked("https://example.com/", None, 0))
            .unwrap();
        output
            .record_edge(&EdgeRecord {
                source: "https://example.com/".to_string(),
                target: "https://example.com/a".to_string(),
            })
            .unwrap();
        output
            .record_edge(&EdgeRecord {
                source: "https://example.com/".to_string(),
                target: "https://example.com/b".to_string(),
            })
            .unwrap();
        output
            .record_error(&ErrorRecord {
                url: "https://example.com/a".to_string(),
                error: "timeout: operation timed out".to_string(),
                parent_url: Some("https://example.com/".to_string()),
                depth: 1,
            })
            .unwrap();
        output.finalize().unwrap();

        let count_lines = |path: &str| fs::read_to_string(path).unwrap().lines().count();
        assert_eq!(count_lines(&config.pages_path), 1);
        assert_eq!(count_lines(&config.edges_path), 2);
        assert_eq!(count_lines(&config.errors_path), 1);
        assert!(!std::path::Path::new(&config.hierarchy_path).exists());
    }

    #[test]
    fn test_create_starts_empty_streams() {
        let dir = tempdir().unwrap();
        let config = output_config(dir.path());
        fs::write(&config.pages_path, "stale\n").unwrap();

        let mut output = JsonlOutput::create(&config).unwrap();
        output.finalize().unwrap();

        assert_eq!(fs::read_to_string(&config.pages_path).unwrap(), "");
        assert!(std::path::Path::new(&config.edges_path).exists());
        assert!(std::path::Path::new(&config.errors_path).exists());
    }
}
