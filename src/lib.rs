//! Local persistence and domain-state layer for the pothole reporting app.
//!
//! Citizens report road-surface defects, follow their status, and rate the
//! repair; administrators advance incidents through their status cycle.
//! Everything is kept in an on-device key-value store, one JSON document per
//! key, rewritten whole on every mutation.
//!
//! Module layout follows the Explicit Module Boundary Pattern (EMBP):
//! - `storage` – the key-value adapter trait and its memory/file backends
//! - `schema` – the persisted key layout
//! - `models` – the records stored under those keys
//! - `stores` – incident, notification, rating and user/session stores
//! - `workflows` – cross-store orchestration and input validation
//! - `location` – device location acquisition with timeout fallback
//! - `stats` – derived views for statistics screens
//! - `config` – environment-driven runtime configuration

pub mod config;
mod error;
pub mod location;
pub mod models;
pub mod schema;
pub mod stats;
pub mod storage;
pub mod stores;
pub mod workflows;

pub use config::Config;
pub use error::{Error, FieldError, Result};
pub use models::{
    Incident, IncidentDraft, NewUser, Notification, NotificationType, Rating, Severity, Status,
    User, UserStats, UserUpdate,
};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use stores::{IncidentStore, NotificationStore, RatingStore, UserStore, ADMIN_EMAIL};
