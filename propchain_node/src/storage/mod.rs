//! Document persistence for PropChain
//!
//! A byte-level [`Storage`] backend sits underneath typed [`Collection`]s.
//! Collections keep JSON documents under `<collection>/doc/<id>` and unique
//! index entries under `<collection>/idx/<field>/<value>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod collection;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use collection::{new_object_id, Collection, Document, Timestamps};
pub use memory::MemoryStorage;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStorage;

// Storage-specific Result type
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// A unique field already holds this value in another document
    #[error("Duplicate value for unique field '{0}'")]
    Duplicate(String),
    #[error("Invalid data: {0}")]
    InvalidData(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_size: u64,
    pub num_entries: u64,
    pub read_operations: u64,
    pub write_operations: u64,
}

/// One step of an atomic [`Storage::write_batch`]
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Key-value backend shared by every collection
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`, in key order
    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply every operation or none of them
    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()>;

    async fn get_stats(&self) -> Result<StorageStats>;
    async fn flush(&self) -> Result<()>;

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list_keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .scan_prefix(prefix)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}
