use super::{BatchOp, Result, Storage, StorageError, StorageStats};
use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// RocksDB-backed storage for deployments that must survive restarts
pub struct RocksStorage {
    db: DB,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl RocksStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(backend)?;
        Ok(Self {
            db,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }
}

fn backend(err: rocksdb::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

#[async_trait]
impl Storage for RocksStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.db.get(key).map_err(backend)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.db.put(key, value).map_err(backend)
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.db.delete(key).map_err(backend)
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let mut entries = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(backend)?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.writes.fetch_add(ops.len() as u64, Ordering::Relaxed);
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => batch.put(key, value),
                BatchOp::Delete(key) => batch.delete(key),
            }
        }
        self.db.write(batch).map_err(backend)
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let mut stats = StorageStats {
            read_operations: self.reads.load(Ordering::Relaxed),
            write_operations: self.writes.load(Ordering::Relaxed),
            ..Default::default()
        };
        for item in self.db.iterator(IteratorMode::Start) {
            let (_, value) = item.map_err(backend)?;
            stats.num_entries += 1;
            stats.total_size += value.len() as u64;
        }
        Ok(stats)
    }

    async fn flush(&self) -> Result<()> {
        self.db.flush().map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = RocksStorage::open(dir.path()).unwrap();
            storage.put(b"users/doc/1", b"alice").await.unwrap();
            storage.flush().await.unwrap();
        }

        let storage = RocksStorage::open(dir.path()).unwrap();
        assert_eq!(
            storage.get(b"users/doc/1").await.unwrap(),
            Some(b"alice".to_vec())
        );
        let entries = storage.scan_prefix(b"users/").await.unwrap();
        assert_eq!(entries.len(), 1);
    }
}
