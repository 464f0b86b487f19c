//! Per-check audit logs and their compressed archives.
//!
//! Every evaluation appends one line to the check's live log. The rotator
//! periodically compresses the live log into an immutable archive and
//! truncates it. Appends and rotation of the same log never interleave.

pub mod store;

pub use store::FileLogArchive;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Log {id}: I/O failed: {source}")]
    Io {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive {0} already exists")]
    ArchiveExists(String),

    // Only raised by decompress, which the worker never calls
    #[allow(dead_code)]
    #[error("Archive {id} is not valid base64: {source}")]
    Decode {
        id: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Compression succeeded but the live log kept its contents
    #[error("Log {id} was archived but could not be truncated: {source}")]
    TruncateFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(id: &str, source: std::io::Error) -> Self {
        Self::Io { id: id.to_string(), source }
    }
}

/// What a rotation did to one live log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    Archived { archive_id: String, bytes: u64 },
    /// Nothing was logged since the last rotation
    Empty,
}

/// Live logs and archives of every check
///
/// The rotator only calls `rotate`. The single-step operations are kept for
/// operator tooling.
#[async_trait]
pub trait LogArchive: Send + Sync {
    /// Append one line to the live log of `id`, creating it if needed
    async fn append(&self, id: &str, line: &str) -> Result<(), ArchiveError>;

    /// Ids of live logs, plus archive ids when `include_compressed` is set
    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, ArchiveError>;

    /// Write the live log of `id` to a new archive named `archive_id`
    #[allow(dead_code)]
    async fn compress(&self, id: &str, archive_id: &str) -> Result<(), ArchiveError>;

    /// Contents of an archive as they were in the live log
    #[allow(dead_code)]
    async fn decompress(&self, archive_id: &str) -> Result<String, ArchiveError>;

    /// Empty the live log of `id`
    #[allow(dead_code)]
    async fn truncate(&self, id: &str) -> Result<(), ArchiveError>;

    /// Compress then truncate, holding the log's lock across both steps
    async fn rotate(&self, id: &str, archive_id: &str) -> Result<Rotation, ArchiveError>;
}
