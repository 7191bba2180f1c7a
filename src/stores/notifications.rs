//! Notification store: user-facing alerts.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::Collection;
use crate::models::{new_id, now_iso, Notification, NotificationType};
use crate::schema::NOTIFICATIONS_KEY;
use crate::storage::KeyValueStore;
use crate::Result;

// ---

/// Owns the notification collection, newest first.
pub struct NotificationStore {
    collection: Collection<Notification>,
}

impl NotificationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: Collection::new(NOTIFICATIONS_KEY, storage),
        }
    }

    /// Load the collection. An absent key yields an empty collection.
    pub async fn load(&self) -> Vec<Notification> {
        // ---
        self.collection.reload(Vec::new).await
    }

    /// Create an unread notification and prepend it.
    pub async fn add(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
        incident_id: impl Into<String>,
        icon: impl Into<String>,
    ) -> Result<Notification> {
        // ---
        let notification = Notification {
            id: new_id(),
            title: title.into(),
            message: message.into(),
            kind,
            incident_id: incident_id.into(),
            read: false,
            created_at: now_iso(),
            icon: icon.into(),
        };
        let created = notification.clone();

        self.collection
            .mutate(move |items| items.insert(0, notification))
            .await?;

        debug!("Notification {} added for incident {}", created.id, created.incident_id);
        Ok(created)
    }

    /// Mark the notification with `id` as read. Unknown ids are a no-op and
    /// write nothing.
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        // ---
        let marked = self
            .collection
            .mutate_if(|items| {
                let n = items.iter_mut().find(|n| n.id == id)?;
                n.read = true;
                Some(())
            })
            .await?;
        if marked.is_none() {
            debug!("Notification {} not found", id);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        // ---
        self.collection
            .mutate(|items| items.iter_mut().for_each(|n| n.read = true))
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.collection
            .mutate(|items| items.retain(|n| n.id != id))
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.collection.clear().await
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.collection.snapshot()
    }

    /// Unread notifications, counted from the current collection on each call.
    pub fn unread_count(&self) -> usize {
        self.collection
            .with_items(|items| items.iter().filter(|n| !n.read).count())
    }

    pub fn for_incident(&self, incident_id: &str) -> Vec<Notification> {
        self.collection.with_items(|items| {
            items
                .iter()
                .filter(|n| n.incident_id == incident_id)
                .cloned()
                .collect()
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.collection.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.collection.last_error()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Adapter whose reads return the value seen at call time, after a delay.
    struct SlowReads {
        inner: MemoryStorage,
        delay: Duration,
    }

    #[async_trait]
    impl KeyValueStore for SlowReads {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let value = self.inner.get(key).await?;
            tokio::time::sleep(self.delay).await;
            Ok(value)
        }

        async fn set(&self, key: &str, value: String) -> Result<()> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    async fn create_test_store() -> NotificationStore {
        // ---
        let store = NotificationStore::new(Arc::new(MemoryStorage::new()));
        store.load().await;
        store
    }

    #[tokio::test]
    async fn test_load_empty_without_seed() {
        // ---
        let store = create_test_store().await;
        assert!(store.notifications().is_empty());
        assert_eq!(store.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_touches_only_match() {
        // ---
        let store = create_test_store().await;
        let a = store
            .add("A", "first", NotificationType::Info, "001", "bell")
            .await
            .unwrap();
        store
            .add("B", "second", NotificationType::Warning, "002", "bell")
            .await
            .unwrap();

        assert_eq!(store.unread_count(), 2);
        store.mark_read(&a.id).await.unwrap();
        assert_eq!(store.unread_count(), 1);

        let notifications = store.notifications();
        assert_eq!(notifications[0].title, "B");
        assert!(!notifications[0].read);
        assert!(notifications[1].read);
    }

    #[tokio::test]
    async fn test_mark_all_read_and_clear() {
        // ---
        let store = create_test_store().await;
        for i in 0..3 {
            store
                .add(format!("N{i}"), "msg", NotificationType::Success, "001", "check")
                .await
                .unwrap();
        }

        store.mark_all_read().await.unwrap();
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.notifications().len(), 3);

        store.clear().await.unwrap();
        assert!(store.notifications().is_empty());
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_incident_filter() {
        // ---
        let store = create_test_store().await;
        let n = store
            .add("A", "m", NotificationType::Danger, "001", "alert")
            .await
            .unwrap();
        store
            .add("B", "m", NotificationType::Info, "002", "bell")
            .await
            .unwrap();

        assert_eq!(store.for_incident("001").len(), 1);
        store.remove(&n.id).await.unwrap();
        assert!(store.for_incident("001").is_empty());
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_overlapping_add_keeps_update() {
        // ---
        let storage = Arc::new(SlowReads {
            inner: MemoryStorage::new(),
            delay: Duration::from_millis(100),
        });
        let store = Arc::new(NotificationStore::new(storage.clone()));

        let refresh = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        store
            .add("A", "during refresh", NotificationType::Info, "001", "bell")
            .await
            .unwrap();
        refresh.await.unwrap();
        store
            .add("B", "after refresh", NotificationType::Info, "001", "bell")
            .await
            .unwrap();

        assert_eq!(store.notifications().len(), 2);
        let raw = storage.inner.raw(NOTIFICATIONS_KEY).await.unwrap();
        let persisted: Vec<Notification> = serde_json::from_str(&raw).unwrap();
        let titles: Vec<&str> = persisted.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["B", "A"]);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id_writes_nothing() {
        // ---
        let storage = Arc::new(MemoryStorage::new());
        let store = NotificationStore::new(storage.clone());
        store.load().await;
        store
            .add("A", "m", NotificationType::Info, "001", "bell")
            .await
            .unwrap();

        storage.fail_writes(true);
        store.mark_read("missing").await.unwrap();

        assert!(store.last_error().is_none());
        assert_eq!(store.unread_count(), 1);
    }
}
