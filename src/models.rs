//! Domain records persisted by the stores.
//!
//! Field names serialize in camelCase so the JSON under each storage key
//! matches what the mobile app has always written. Enum values serialize in
//! English and also accept the legacy Portuguese spellings on read.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ---

/// How serious a reported defect is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "baixa")]
    Low,
    #[serde(alias = "média", alias = "media")]
    Medium,
    #[serde(alias = "alta")]
    High,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Lifecycle stage of an incident.
///
/// Transitions form a cycle with no terminal state:
/// `Pending -> InProgress -> Resolved -> Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[serde(alias = "pendente")]
    Pending,
    #[serde(alias = "em_andamento")]
    InProgress,
    #[serde(alias = "resolvido")]
    Resolved,
}

impl Status {
    /// The status one explicit "advance" action moves to.
    pub fn next(self) -> Self {
        match self {
            Self::Pending => Self::InProgress,
            Self::InProgress => Self::Resolved,
            Self::Resolved => Self::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In progress",
            Self::Resolved => "Resolved",
        }
    }
}

/// A reported road-surface defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    // ---
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    /// Pre-formatted display date, redundant with `created_at`.
    pub date: String,
    /// Human-readable location label.
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// An incident before the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentDraft {
    pub description: String,
    pub severity: Severity,
    pub status: Status,
    pub image_uri: Option<String>,
    pub date: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl IncidentDraft {
    pub(crate) fn into_incident(self, id: String, created_at: String) -> Incident {
        // ---
        Incident {
            id,
            description: self.description,
            severity: self.severity,
            status: self.status,
            image_uri: self.image_uri,
            date: self.date,
            location: self.location,
            latitude: self.latitude,
            longitude: self.longitude,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Danger,
}

/// A user-facing alert, usually created after an incident changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    // ---
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Not enforced; may dangle after the incident is deleted.
    pub incident_id: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: String,
    pub icon: String,
}

/// Post-resolution feedback for an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    // ---
    pub id: String,
    pub incident_id: String,
    pub stars: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: String,
}

/// A registered account.
///
/// `password` is kept exactly as submitted. The same shape is stored both in
/// the master user list and, as a snapshot, in the current-user slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    // ---
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub total_reports: u32,
    #[serde(default)]
    pub resolved_reports: u32,
    pub joined_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Case-insensitive email comparison used for uniqueness and login.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }

    pub(crate) fn apply(&mut self, update: &UserUpdate) {
        // ---
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(password) = &update.password {
            self.password = password.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(city) = &update.city {
            self.city = Some(city.clone());
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = Some(avatar.clone());
        }
    }

    pub(crate) fn with_stats(mut self, stats: UserStats) -> Self {
        self.total_reports = stats.total_reports;
        self.resolved_reports = stats.resolved_reports;
        self
    }

    pub(crate) fn stats(&self) -> UserStats {
        UserStats {
            total_reports: self.total_reports,
            resolved_reports: self.resolved_reports,
        }
    }
}

/// Registration payload, already validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// Partial profile change; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
}

/// Per-user report counters, stored under their own key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub total_reports: u32,
    #[serde(default)]
    pub resolved_reports: u32,
}

/// Fresh time-ordered identifier for a new record.
pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Current UTC time as an ISO-8601 string.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
