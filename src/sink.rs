//! Output sinks for accepted records
//!
//! Records are written as newline-delimited JSON. Every record is serialized
//! into a complete line before the first byte reaches the output, so a line is
//! either written whole or not at all.
//!
//! - [`PartitionedFiles`] gives each partition its own file. The job for that
//!   partition is the only writer, so no locking is involved.
//! - [`SharedStream`] funnels every partition into one writer behind an async
//!   mutex. The lock is held for the write and flush of a single line only.

use crate::error::Result;
use crate::types::{MetadataRecord, PartitionKey};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{Mutex, MutexGuard};

/// Factory for per-partition writers
pub trait RecordSink: Send + Sync {
    /// Writer for `key`; nothing is opened until the first append
    ///
    /// `file_name` comes from [`crate::partition::Partitions::file_names`]
    /// and is unique among the partitions of one run. Sinks that do not
    /// write files ignore it.
    fn writer(&self, key: &PartitionKey, file_name: &str) -> Box<dyn PartitionWriter>;
}

/// Writer owned by a single partition job
#[async_trait]
pub trait PartitionWriter: Send {
    /// Append one record as a JSON line
    async fn append(&mut self, record: &MetadataRecord) -> Result<()>;

    /// Flush and close
    ///
    /// Returns the file written, if this writer produced one.
    async fn finish(self: Box<Self>) -> Result<Option<PathBuf>>;
}

/// One file per partition in a directory, normally `<volume>.<issue>.txt`
#[derive(Clone, Debug)]
pub struct PartitionedFiles {
    dir: PathBuf,
}

impl PartitionedFiles {
    /// Create the sink, creating `dir` if needed
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the partition file called `file_name`
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl RecordSink for PartitionedFiles {
    fn writer(&self, _key: &PartitionKey, file_name: &str) -> Box<dyn PartitionWriter> {
        Box::new(PartitionFile {
            path: self.path_for(file_name),
            file: None,
        })
    }
}

/// Lazily opened partition file
///
/// The file is created (and truncated) on the first accepted record, so
/// partitions without a single accepted record leave no file behind and a
/// re-run replaces earlier output instead of appending to it.
struct PartitionFile {
    path: PathBuf,
    file: Option<BufWriter<tokio::fs::File>>,
}

#[async_trait]
impl PartitionWriter for PartitionFile {
    async fn append(&mut self, record: &MetadataRecord) -> Result<()> {
        let line = record.to_line()?;
        if self.file.is_none() {
            let handle = tokio::fs::File::create(&self.path).await?;
            tracing::debug!(path = %self.path.display(), "opened partition file");
            self.file = Some(BufWriter::new(handle));
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(&line).await?;
        }
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<Option<PathBuf>> {
        let PartitionFile { path, file } = *self;
        let Some(mut file) = file else {
            return Ok(None);
        };
        file.flush().await?;
        let handle = file.into_inner();
        handle.sync_all().await?;
        Ok(Some(path))
    }
}

/// Every record to one shared writer (stdout in the CLI)
///
/// Cloning shares the same writer and lock.
pub struct SharedStream<W> {
    out: Arc<Mutex<W>>,
}

impl<W> Clone for SharedStream<W> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl<W> SharedStream<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap `out`
    pub fn new(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Write one record as a complete line
    pub async fn emit(&self, record: &MetadataRecord) -> Result<()> {
        let line = record.to_line()?;
        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    /// Lock the underlying writer, e.g. to inspect an in-memory buffer
    pub async fn lock(&self) -> MutexGuard<'_, W> {
        self.out.lock().await
    }
}

impl<W> RecordSink for SharedStream<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn writer(&self, _key: &PartitionKey, _file_name: &str) -> Box<dyn PartitionWriter> {
        Box::new(StreamWriter {
            stream: self.clone(),
        })
    }
}

struct StreamWriter<W> {
    stream: SharedStream<W>,
}

#[async_trait]
impl<W> PartitionWriter for StreamWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn append(&mut self, record: &MetadataRecord) -> Result<()> {
        self.stream.emit(record).await
    }

    async fn finish(self: Box<Self>) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
