//! Incident store: the collection of reported defects.

use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use super::Collection;
use crate::models::{new_id, now_iso, Incident, IncidentDraft, Severity, Status};
use crate::schema::INCIDENTS_KEY;
use crate::storage::KeyValueStore;
use crate::Result;

// ---

/// Owns the incident collection, newest first by insertion.
pub struct IncidentStore {
    collection: Collection<Incident>,
}

impl IncidentStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            collection: Collection::new(INCIDENTS_KEY, storage),
        }
    }

    /// Load the collection, seeding three example incidents on first use.
    ///
    /// Never fails: read or parse errors set [`last_error`](Self::last_error)
    /// and leave the in-memory collection at its previous value.
    pub async fn load(&self) -> Vec<Incident> {
        // ---
        self.collection
            .reload(|| {
                let seeded = seed_incidents();
                info!("No incidents stored, seeding {} examples", seeded.len());
                seeded
            })
            .await
    }

    /// Alias for [`load`](Self::load), for pull-to-refresh call sites.
    pub async fn refresh(&self) -> Vec<Incident> {
        self.load().await
    }

    /// Assign an id and creation timestamp, prepend, persist.
    pub async fn add(&self, draft: IncidentDraft) -> Result<Incident> {
        // ---
        let incident = draft.into_incident(new_id(), now_iso());
        let created = incident.clone();

        self.collection
            .mutate(move |items| items.insert(0, incident))
            .await?;

        debug!("Incident {} added", created.id);
        Ok(created)
    }

    /// Replace the status of the incident with `id`. Unknown ids change nothing.
    ///
    /// Returns the updated record, or `None` when no incident matched.
    pub async fn update_status(&self, id: &str, status: Status) -> Result<Option<Incident>> {
        // ---
        let updated = self
            .collection
            .mutate_if(|items| {
                items.iter_mut().find(|i| i.id == id).map(|incident| {
                    incident.status = status;
                    incident.clone()
                })
            })
            .await?;

        match &updated {
            Some(_) => debug!("Incident {} -> {:?}", id, status),
            None => debug!("Incident {} not found, status unchanged", id),
        }
        Ok(updated)
    }

    /// Drop the incident with `id`. Notifications and ratings referencing it
    /// are left in place.
    pub async fn remove(&self, id: &str) -> Result<()> {
        // ---
        self.collection
            .mutate(|items| items.retain(|i| i.id != id))
            .await?;
        debug!("Incident {} removed", id);
        Ok(())
    }

    /// Empty the collection and delete the backing key.
    pub async fn clear(&self) -> Result<()> {
        self.collection.clear().await?;
        info!("All incidents cleared");
        Ok(())
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.collection.snapshot()
    }

    pub fn get(&self, id: &str) -> Option<Incident> {
        self.collection
            .with_items(|items| items.iter().find(|i| i.id == id).cloned())
    }

    pub fn len(&self) -> usize {
        self.collection.with_items(<[Incident]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver notified after every successful load or mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Incident>> {
        self.collection.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.collection.last_error()
    }

    pub fn storage_key(&self) -> &'static str {
        self.collection.key()
    }
}

/// Example data shown the first time the app opens.
fn seed_incidents() -> Vec<Incident> {
    // ---
    let now = Utc::now();
    let at = |days: i64| (now - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);

    vec![
        Incident {
            id: "001".to_string(),
            description: "Large pothole on Main Street, roughly 60cm across".to_string(),
            severity: Severity::High,
            status: Status::Pending,
            image_uri: None,
            date: "Today".to_string(),
            location: "Main Street, 500".to_string(),
            latitude: -23.5505,
            longitude: -46.6333,
            created_at: at(0),
        },
        Incident {
            id: "002".to_string(),
            description: "Small pothole on the side road".to_string(),
            severity: Severity::Low,
            status: Status::InProgress,
            image_uri: None,
            date: "Yesterday".to_string(),
            location: "Secondary Avenue".to_string(),
            latitude: -23.5510,
            longitude: -46.6340,
            created_at: at(1),
        },
        Incident {
            id: "003".to_string(),
            description: "Wide puddle over broken asphalt, accident risk".to_string(),
            severity: Severity::Medium,
            status: Status::Resolved,
            image_uri: None,
            date: "2 days ago".to_string(),
            location: "Flower Street".to_string(),
            latitude: -23.5515,
            longitude: -46.6320,
            created_at: at(2),
        },
    ]
}
