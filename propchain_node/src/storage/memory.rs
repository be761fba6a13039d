use super::{BatchOp, Result, Storage, StorageStats};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ordered in-memory storage; the default backend and the one tests run on
pub struct MemoryStorage {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data.write().remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let data = self.data.read();
        let entries = data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(entries)
    }

    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<()> {
        self.writes.fetch_add(ops.len() as u64, Ordering::Relaxed);
        let mut data = self.data.write();
        for op in ops {
            match op {
                BatchOp::Put(key, value) => {
                    data.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats> {
        let data = self.data.read();
        Ok(StorageStats {
            total_size: data.values().map(|v| v.len() as u64).sum(),
            num_entries: data.len() as u64,
            read_operations: self.reads.load(Ordering::Relaxed),
            write_operations: self.writes.load(Ordering::Relaxed),
        })
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
