//! Error types for the persistence and domain-state layer.
//!
//! Every store operation returns [`Result`]. The variants keep the four
//! failure categories apart so a caller can tell "invalid credentials" from
//! "storage unavailable" without string matching.

use std::fmt;

use thiserror::Error;

use crate::models::Incident;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A single field-level validation failure, produced by the workflow layer
/// before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised by stores, workflows and storage adapters.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// The key-value adapter could not read, write or remove a key.
    #[error("storage unavailable for key '{key}': {reason}")]
    Storage { key: String, reason: String },

    /// A persisted value could not be encoded or decoded.
    #[error("malformed data under key '{key}'")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// No registered user matches the supplied email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Registration attempted with an email that is already taken.
    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("incident not found: {id}")]
    IncidentNotFound { id: String },

    /// One or more input fields were rejected before reaching a store.
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// The primary mutation succeeded but the follow-up notification failed.
    #[error("status of incident {incident_id} updated but notification failed")]
    Notification {
        incident_id: String,
        #[source]
        source: Box<Error>,
    },

    /// The report was saved but its confirmation notification or the
    /// reporter's counter update failed. The incident must not be re-sent.
    #[error("incident {} saved but report follow-up failed", .incident.id)]
    ReportFollowUp {
        incident: Box<Incident>,
        #[source]
        source: Box<Error>,
    },
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn storage(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serialization { .. })
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }

    pub fn is_duplicate_email(&self) -> bool {
        matches!(self, Self::DuplicateEmail { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The incident already persisted when a report failed part-way.
    pub fn saved_incident(&self) -> Option<&Incident> {
        match self {
            Self::ReportFollowUp { incident, .. } => Some(incident),
            _ => None,
        }
    }

    /// Field errors carried by a validation failure, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        // ---
        let err = Error::Validation(vec![
            FieldError::new("name", "too short"),
            FieldError::new("city", "required"),
        ]);

        assert_eq!(
            err.to_string(),
            "validation failed: name: too short; city: required"
        );
        assert_eq!(err.field_errors().len(), 2);
        assert!(err.is_validation());
        assert!(!err.is_storage());
    }

    #[test]
    fn test_credentials_distinct_from_storage() {
        // ---
        let auth = Error::InvalidCredentials;
        let storage = Error::storage("@tapaburaco_users", "disk full");

        assert!(auth.is_invalid_credentials());
        assert!(!auth.is_storage());
        assert!(storage.is_storage());
        assert!(!storage.is_invalid_credentials());
        assert!(storage.field_errors().is_empty());
    }

    #[test]
    fn test_report_follow_up_keeps_saved_incident() {
        // ---
        let incident = crate::models::IncidentDraft {
            description: "Deep pothole near the bus stop".to_string(),
            severity: crate::models::Severity::High,
            status: crate::models::Status::Pending,
            image_uri: None,
            date: "19/10/26".to_string(),
            location: "-23.5505, -46.6333".to_string(),
            latitude: -23.5505,
            longitude: -46.6333,
        }
        .into_incident("001".to_string(), "2026-10-19T12:00:00.000Z".to_string());
        let err = Error::ReportFollowUp {
            incident: Box::new(incident),
            source: Box::new(Error::storage("@tapaburaco_notifications", "disk full")),
        };

        assert!(!err.is_storage());
        assert_eq!(err.saved_incident().map(|i| i.id.as_str()), Some("001"));
        assert_eq!(
            err.to_string(),
            "incident 001 saved but report follow-up failed"
        );
    }
}
