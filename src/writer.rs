//! Streaming output sink
//!
//! Successful results are appended one JSON object per line:
//!
//! ```text
//! {"url":"https://example.com/a.json","content":{"id":1}}
//! ```
//!
//! Each record is flushed and synced before `append` returns, so a run that is
//! killed midway keeps every record that was reported as written.

use crate::error::Result;
use crate::types::FetchResult;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Destination for successful fetch results
///
/// The orchestrator is the only caller and appends one result at a time, in
/// completion order.
pub trait ResultSink: Send {
    /// Persist one result. Failed results are ignored.
    fn append(&mut self, result: &FetchResult) -> Result<()>;

    /// Number of records persisted so far
    fn records_written(&self) -> usize;
}

/// Storage that can push written bytes to durable media
pub trait Durable {
    /// Make everything written so far durable
    fn persist(&mut self) -> io::Result<()>;
}

impl Durable for File {
    fn persist(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Durable for Vec<u8> {
    fn persist(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    url: &'a str,
    content: &'a Value,
}

/// Newline-delimited JSON writer
#[derive(Debug)]
pub struct JsonlWriter<W = File> {
    inner: W,
    path: Option<PathBuf>,
    written: usize,
}

impl JsonlWriter<File> {
    /// Create (or truncate) the file at `path`, creating parent directories
    ///
    /// Whatever the file held before is discarded.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), "Created output sink");
        Ok(Self {
            inner: file,
            path: Some(path.to_path_buf()),
            written: 0,
        })
    }
}

impl<W: Write + Durable> JsonlWriter<W> {
    /// Wrap an already opened writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            path: None,
            written: 0,
        }
    }

    /// Path of the backing file, if the writer was created from one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Durable + Send> ResultSink for JsonlWriter<W> {
    fn append(&mut self, result: &FetchResult) -> Result<()> {
        let content = match (&result.content, result.success) {
            (Some(content), true) => content,
            _ => return Ok(()),
        };

        let mut line = serde_json::to_vec(&OutputRecord {
            url: &result.url,
            content,
        })?;
        line.push(b'\n');

        self.inner.write_all(&line)?;
        self.inner.flush()?;
        self.inner.persist()?;
        self.written += 1;
        Ok(())
    }

    fn records_written(&self) -> usize {
        self.written
    }
}
