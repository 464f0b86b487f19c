use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{ArchiveError, LogArchive, Rotation};

const LIVE_EXT: &str = ".log";
const ARCHIVE_EXT: &str = ".gz.b64";

/// Live logs and archives side by side in one directory
///
/// - `<dir>/<id>.log`: newline separated JSON entries
/// - `<dir>/<archive_id>.gz.b64`: gzip of a live log, base64 encoded
pub struct FileLogArchive {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileLogArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), locks: Mutex::new(HashMap::new()) }
    }

    fn live_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{LIVE_EXT}"))
    }

    fn archive_path(&self, archive_id: &str) -> PathBuf {
        self.dir.join(format!("{archive_id}{ARCHIVE_EXT}"))
    }

    /// Per-log lock serializing appends against rotation
    ///
    /// Locks nobody holds or waits on are dropped from the map on the way in,
    /// so it only ever holds the logs currently in use.
    async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Returns the number of live bytes archived, 0 if there was nothing to do
    async fn compress_unlocked(&self, id: &str, archive_id: &str) -> Result<u64, ArchiveError> {
        let contents = fs::read(self.live_path(id)).await.map_err(|e| ArchiveError::io(id, e))?;
        if contents.is_empty() {
            return Ok(0);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents).map_err(|e| ArchiveError::io(id, e))?;
        let compressed = encoder.finish().map_err(|e| ArchiveError::io(id, e))?;

        // Never overwrite an earlier archive
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.archive_path(archive_id))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ArchiveError::ArchiveExists(archive_id.to_string()));
            }
            Err(e) => return Err(ArchiveError::io(archive_id, e)),
        };

        file.write_all(BASE64.encode(compressed).as_bytes())
            .await
            .map_err(|e| ArchiveError::io(archive_id, e))?;
        file.flush().await.map_err(|e| ArchiveError::io(archive_id, e))?;

        Ok(contents.len() as u64)
    }

    async fn truncate_unlocked(&self, id: &str) -> std::io::Result<()> {
        let file = fs::OpenOptions::new().write(true).open(self.live_path(id)).await?;
        file.set_len(0).await
    }
}

#[async_trait]
impl LogArchive for FileLogArchive {
    async fn append(&self, id: &str, line: &str) -> Result<(), ArchiveError> {
        let _guard = self.lock(id).await;

        fs::create_dir_all(&self.dir).await.map_err(|e| ArchiveError::io(id, e))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.live_path(id))
            .await
            .map_err(|e| ArchiveError::io(id, e))?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes()).await.map_err(|e| ArchiveError::io(id, e))?;
        file.flush().await.map_err(|e| ArchiveError::io(id, e))
    }

    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, ArchiveError> {
        let dir_name = self.dir.display().to_string();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArchiveError::io(&dir_name, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ArchiveError::io(&dir_name, e))? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if let Some(id) = name.strip_suffix(LIVE_EXT) {
                ids.push(id.to_string());
            } else if let Some(id) = name.strip_suffix(ARCHIVE_EXT) {
                if include_compressed {
                    ids.push(id.to_string());
                }
            }
        }

        Ok(ids)
    }

    async fn compress(&self, id: &str, archive_id: &str) -> Result<(), ArchiveError> {
        let _guard = self.lock(id).await;
        self.compress_unlocked(id, archive_id).await.map(|_| ())
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, ArchiveError> {
        let encoded =
            fs::read(self.archive_path(archive_id)).await.map_err(|e| ArchiveError::io(archive_id, e))?;
        let compressed = BASE64
            .decode(encoded.trim_ascii())
            .map_err(|source| ArchiveError::Decode { id: archive_id.to_string(), source })?;

        let mut contents = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut contents)
            .map_err(|e| ArchiveError::io(archive_id, e))?;
        Ok(contents)
    }

    async fn truncate(&self, id: &str) -> Result<(), ArchiveError> {
        let _guard = self.lock(id).await;
        self.truncate_unlocked(id).await.map_err(|e| ArchiveError::io(id, e))
    }

    async fn rotate(&self, id: &str, archive_id: &str) -> Result<Rotation, ArchiveError> {
        let _guard = self.lock(id).await;

        let bytes = self.compress_unlocked(id, archive_id).await?;
        if bytes == 0 {
            return Ok(Rotation::Empty);
        }

        self.truncate_unlocked(id)
            .await
            .map_err(|source| ArchiveError::TruncateFailed { id: id.to_string(), source })?;

        Ok(Rotation::Archived { archive_id: archive_id.to_string(), bytes })
    }
}
