/// Record storage used by the worker
///
/// Records are JSON documents addressed by collection and id. The CRUD layer
/// owns creation and deletion; the worker only lists, reads and updates.

pub mod repository;

pub use repository::FileStorage;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection holding check records
pub const CHECKS: &str = "checks";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[allow(dead_code)]
    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("{collection}/{id} is not valid JSON: {source}")]
    Corrupt {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage trait for abstracting the persistence backend
#[async_trait]
pub trait Storage: Send + Sync {
    /// Ids of every record in the collection
    async fn list(&self, collection: &str) -> Result<Vec<String>, StorageError>;

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StorageError>;

    /// Create a new record, failing if the id is taken
    #[allow(dead_code)]
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError>;

    /// Replace an existing record
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError>;

    #[allow(dead_code)]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;
}
