//! Key-value persistence adapter.
//!
//! The stores only ever see [`KeyValueStore`]: an async, string-keyed store
//! with whole-value replace semantics. Two implementations live behind this
//! gateway (EMBP):
//! - [`MemoryStorage`] for tests and ephemeral sessions, with failure injection
//! - [`FileStorage`] for on-device persistence, one file per key

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::{Error, Result};

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// ---

/// Async string-keyed storage provided by the host platform.
///
/// Every call may suspend and may fail with [`Error::Storage`]. A `set`
/// replaces the whole value atomically at the granularity the backend
/// offers; there is no transaction spanning keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes the key. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode the JSON value under `key`.
pub async fn read_json<T>(storage: &dyn KeyValueStore, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    // ---
    match storage.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`.
pub async fn write_json<T>(storage: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    // ---
    let raw = serde_json::to_string(value).map_err(|source| Error::Serialization {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, raw).await
}
