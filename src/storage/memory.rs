//! In-process [`KeyValueStore`] backed by a map.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::{Error, Result};

// ---

/// Map-backed storage. Reads and writes can be made to fail on demand so
/// callers can exercise their storage-unavailable paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_reads: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every `get` fails with [`Error::Storage`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// When set, every `set` and `remove` fails with [`Error::Storage`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Like [`fail_reads`](Self::fail_reads), for `key` only.
    pub async fn fail_reads_for(&self, key: &str, fail: bool) {
        toggle(&self.failing_reads, key, fail).await;
    }

    /// Like [`fail_writes`](Self::fail_writes), for `key` only.
    pub async fn fail_writes_for(&self, key: &str, fail: bool) {
        toggle(&self.failing_writes, key, fail).await;
    }

    async fn read_fails(&self, key: &str) -> bool {
        self.fail_reads.load(Ordering::SeqCst) || self.failing_reads.read().await.contains(key)
    }

    async fn write_fails(&self, key: &str) -> bool {
        self.fail_writes.load(Ordering::SeqCst) || self.failing_writes.read().await.contains(key)
    }

    /// Raw value under `key`, bypassing failure injection.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        // ---
        if self.read_fails(key).await {
            return Err(Error::storage(key, "read failure injected"));
        }
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        // ---
        if self.write_fails(key).await {
            return Err(Error::storage(key, "write failure injected"));
        }
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        // ---
        if self.write_fails(key).await {
            return Err(Error::storage(key, "write failure injected"));
        }
        self.values.write().await.remove(key);
        Ok(())
    }
}

async fn toggle(keys: &RwLock<HashSet<String>>, key: &str, on: bool) {
    let mut keys = keys.write().await;
    if on {
        keys.insert(key.to_string());
    } else {
        keys.remove(key);
    }
}
