//! Domain stores gateway (EMBP).
//!
//! Each store owns one collection persisted under one key. Stores never call
//! each other; cross-store effects belong to [`crate::workflows`].
//!
//! Shared mechanics live in [`Collection`]: an in-memory cache published
//! through a `watch` channel, an error flag, and a write lock that serializes
//! read-modify-write cycles within one store instance. Two store instances
//! over the same adapter still race at key level (last write wins).

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{watch, Mutex};

use crate::storage::{read_json, write_json, KeyValueStore};
use crate::Result;

mod incidents;
mod notifications;
mod ratings;
mod users;

pub use incidents::IncidentStore;
pub use notifications::NotificationStore;
pub use ratings::RatingStore;
pub use users::{UserStore, ADMIN_EMAIL};

// ---

pub(crate) struct Collection<T> {
    key: &'static str,
    storage: Arc<dyn KeyValueStore>,
    items: watch::Sender<Vec<T>>,
    error: watch::Sender<Option<String>>,
    write_lock: Mutex<()>,
}

impl<T> Collection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub(crate) fn new(key: &'static str, storage: Arc<dyn KeyValueStore>) -> Self {
        // ---
        Self {
            key,
            storage,
            items: watch::Sender::new(Vec::new()),
            error: watch::Sender::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Re-read the persisted collection and publish it, holding the write
    /// lock so a mutation cannot land between the read and the publish.
    ///
    /// When the key is absent, `seed` supplies the starting collection; it is
    /// published and, if non-empty, persisted. Read failures set the error
    /// flag and leave the cache as it was.
    pub(crate) async fn reload(&self, seed: impl FnOnce() -> Vec<T>) -> Vec<T> {
        // ---
        let _guard = self.write_lock.lock().await;
        match read_json::<Vec<T>>(self.storage.as_ref(), self.key).await {
            Ok(Some(items)) => {
                tracing::debug!("{}: loaded {} records", self.key, items.len());
                self.publish(items);
            }
            Ok(None) => {
                let seeded = seed();
                self.publish(seeded.clone());
                // A failed seed write is flagged; the seed stays visible.
                if !seeded.is_empty() && self.write_then_publish(seeded).await.is_err() {
                    tracing::debug!("{}: seed not persisted", self.key);
                }
            }
            Err(e) => self.flag(&e),
        }
        self.snapshot()
    }

    fn publish(&self, items: Vec<T>) {
        self.items.send_replace(items);
        self.error.send_replace(None);
    }

    /// Apply `f` to a copy of the cached collection, persist the result and
    /// publish it. On write failure the cache is left as it was.
    pub(crate) async fn mutate<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        // ---
        let _guard = self.write_lock.lock().await;
        let mut next = self.items.borrow().clone();
        let out = f(&mut next);
        self.write_then_publish(next).await?;
        Ok(out)
    }

    /// Like [`mutate`](Self::mutate), but `f` returning `None` means nothing
    /// matched: no write happens and the cache is left as it was.
    pub(crate) async fn mutate_if<F, R>(&self, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut Vec<T>) -> Option<R>,
    {
        // ---
        let _guard = self.write_lock.lock().await;
        let mut next = self.items.borrow().clone();
        let Some(out) = f(&mut next) else {
            return Ok(None);
        };
        self.write_then_publish(next).await?;
        Ok(Some(out))
    }

    /// Remove the backing key and empty the cache.
    pub(crate) async fn clear(&self) -> Result<()> {
        // ---
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.storage.remove(self.key).await {
            self.flag(&e);
            return Err(e);
        }
        self.items.send_replace(Vec::new());
        Ok(())
    }

    async fn write_then_publish(&self, next: Vec<T>) -> Result<()> {
        // ---
        if let Err(e) = write_json(self.storage.as_ref(), self.key, &next).await {
            self.flag(&e);
            return Err(e);
        }
        self.items.send_replace(next);
        Ok(())
    }

    fn flag(&self, err: &crate::Error) {
        tracing::warn!("{}: {}", self.key, err);
        self.error.send_replace(Some(err.to_string()));
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    pub(crate) fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.items.subscribe()
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub(crate) fn key(&self) -> &'static str {
        self.key
    }
}
