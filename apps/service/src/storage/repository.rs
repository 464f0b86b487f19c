use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{Storage, StorageError};

/// One JSON file per record: `<base>/<collection>/<id>.json`
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, collection: &str, id: &str) -> PathBuf {
        self.base_dir.join(collection).join(format!("{id}.json"))
    }

    fn not_found(collection: &str, id: &str) -> StorageError {
        StorageError::NotFound { collection: collection.to_string(), id: id.to_string() }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn list(&self, collection: &str) -> Result<Vec<String>, StorageError> {
        let mut entries = match fs::read_dir(self.base_dir.join(collection)).await {
            Ok(entries) => entries,
            // Nothing was ever written to this collection
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(|name| name.strip_suffix(".json")) {
                ids.push(id.to_string());
            }
        }

        Ok(ids)
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StorageError> {
        let raw = match fs::read(self.record_path(collection, id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Self::not_found(collection, id)),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|source| StorageError::Corrupt {
            collection: collection.to_string(),
            id: id.to_string(),
            source,
        })
    }

    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError> {
        let path = self.record_path(collection, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(&serde_json::to_vec(record)?).await?;
        file.flush().await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError> {
        let path = self.record_path(collection, id);
        if !fs::try_exists(&path).await? {
            return Err(Self::not_found(collection, id));
        }

        fs::write(&path, serde_json::to_vec(record)?).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.record_path(collection, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(collection, id)),
            Err(e) => Err(e.into()),
        }
    }
}
