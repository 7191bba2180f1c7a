//! Rating store: post-resolution feedback.
//!
//! Ratings are appended (oldest first), unlike the other collections. The
//! order is kept for parity with ratings already stored on devices.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::Collection;
use crate::models::{new_id, now_iso, Rating};
use crate::schema::RATINGS_KEY;
use crate::storage::KeyValueStore;
use crate::Result;

// ---

pub struct RatingStore {
    collection: Collection<Rating>,
}

impl RatingStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: Collection::new(RATINGS_KEY, storage),
        }
    }

    /// Load the collection. An absent key yields an empty collection.
    pub async fn load(&self) -> Vec<Rating> {
        // ---
        self.collection.reload(Vec::new).await
    }

    /// Append a rating. `stars` is not range-checked here.
    pub async fn add(
        &self,
        incident_id: impl Into<String>,
        stars: u8,
        comment: Option<String>,
    ) -> Result<Rating> {
        // ---
        let rating = Rating {
            id: new_id(),
            incident_id: incident_id.into(),
            stars,
            comment,
            created_at: now_iso(),
        };
        let created = rating.clone();

        self.collection.mutate(move |items| items.push(rating)).await?;

        debug!("Rating {} ({} stars) for incident {}", created.id, stars, created.incident_id);
        Ok(created)
    }

    /// First rating, in stored order, for `incident_id`. Later duplicates
    /// are kept but never surfaced.
    pub fn find_by_incident(&self, incident_id: &str) -> Option<Rating> {
        self.collection
            .with_items(|items| items.iter().find(|r| r.incident_id == incident_id).cloned())
    }

    /// Mean star count rounded to one decimal place; `0.0` when empty.
    pub fn average(&self) -> f64 {
        self.collection.with_items(average_stars)
    }

    pub fn ratings(&self) -> Vec<Rating> {
        self.collection.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Rating>> {
        self.collection.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.collection.last_error()
    }
}

fn average_stars(ratings: &[Rating]) -> f64 {
    // ---
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| u32::from(r.stars)).sum();
    let mean = f64::from(sum) / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::storage::MemoryStorage;

    async fn create_test_store() -> RatingStore {
        // ---
        let store = RatingStore::new(Arc::new(MemoryStorage::new()));
        store.load().await;
        store
    }

    #[tokio::test]
    async fn test_average() {
        // ---
        let store = create_test_store().await;
        assert_eq!(store.average(), 0.0);

        for stars in [5, 4, 3] {
            store.add("001", stars, None).await.unwrap();
        }
        assert_eq!(store.average(), 4.0);
    }

    #[tokio::test]
    async fn test_average_rounds_to_one_decimal() {
        // ---
        let store = create_test_store().await;
        for stars in [5, 4, 4] {
            store.add("001", stars, None).await.unwrap();
        }
        // 13 / 3 = 4.333...
        assert_eq!(store.average(), 4.3);
    }

    #[tokio::test]
    async fn test_append_order_and_first_match() {
        // ---
        let store = create_test_store().await;
        let first = store
            .add("001", 2, Some("slow repair".to_string()))
            .await
            .unwrap();
        store.add("001", 5, None).await.unwrap();

        let ratings = store.ratings();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].id, first.id);

        let found = store.find_by_incident("001").unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.comment.as_deref(), Some("slow repair"));
        assert!(store.find_by_incident("999").is_none());
    }
}
