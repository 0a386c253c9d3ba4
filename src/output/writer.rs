//! Append-only JSON-lines writer
//!
//! Each record is serialized in memory, then handed to the file with a single
//! `write_all` and flushed before `append` returns. A crash loses at most the
//! record being written; nothing is buffered across calls.

use crate::{AtlasError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Line-delimited JSON stream of one record type
#[derive(Debug)]
pub struct JsonlWriter<T> {
    path: PathBuf,
    file: Option<File>,
    records: u64,
    line: Vec<u8>,
    _record: PhantomData<fn(&T)>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Creates (or truncates) the stream, creating parent directories as needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| output_error(parent, source))?;
        }

        let file = File::create(&path).map_err(|source| output_error(&path, source))?;

        Ok(Self {
            path,
            file: Some(file),
            records: 0,
            line: Vec::with_capacity(512),
            _record: PhantomData,
        })
    }

    /// Appends one record as a single line and flushes it
    pub fn append(&mut self, record: &T) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            output_error(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::Other, "stream already finished"),
            )
        })?;

        self.line.clear();
        serde_json::to_writer(&mut self.line, record)?;
        self.line.push(b'\n');

        file.write_all(&self.line)
            .and_then(|_| file.flush())
            .map_err(|source| output_error(&self.path, source))?;

        self.records += 1;
        Ok(())
    }

    /// Flushes to stable storage and closes the stream
    pub fn finish(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|source| output_error(&self.path, source))?;
        }
        Ok(())
    }

    /// Number of records appended so far
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Drop for JsonlWriter<T> {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush() {
                tracing::error!("Failed to flush {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Writes a value as one pretty-printed JSON document, creating parent directories
pub fn write_json_document<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| output_error(parent, source))?;
    }

    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    fs::write(path, json).map_err(|source| output_error(path, source))
}

fn output_error(path: &Path, source: std::io::Error) -> AtlasError {
    AtlasError::Output {
        path: path.display().to_string(),
        source,
    }
}
