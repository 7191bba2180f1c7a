//! Caller-side orchestration across stores, plus input validation.
//!
//! Stores are independent; anything that touches more than one of them
//! happens here, in sequence. Each step commits on its own: a later failure
//! never rolls back an earlier step.

use chrono::Local;
use tracing::{debug, info, warn};

use crate::location::Coordinates;
use crate::models::{Incident, IncidentDraft, NewUser, NotificationType, Rating, Severity, Status};
use crate::stores::{IncidentStore, NotificationStore, RatingStore, UserStore};
use crate::{Error, FieldError, Result};

// ---

pub const MIN_DESCRIPTION_LEN: usize = 10;

/// What the reporter filled in on the report screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    pub description: String,
    pub severity: Severity,
    pub image_uri: Option<String>,
    pub coordinates: Coordinates,
}

/// Validate and file a new report, notify the reporter, and bump their
/// report counter.
///
/// Once the incident is saved, a failure in the later steps is returned as
/// [`Error::ReportFollowUp`] carrying the saved incident.
pub async fn report_incident(
    incidents: &IncidentStore,
    notifications: &NotificationStore,
    users: &UserStore,
    report: ReportDraft,
) -> Result<Incident> {
    // ---
    let mut errors = Vec::new();
    if report.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
        errors.push(FieldError::new(
            "description",
            format!("must be at least {MIN_DESCRIPTION_LEN} characters"),
        ));
    }
    if report.image_uri.as_deref().map_or(true, |uri| uri.trim().is_empty()) {
        errors.push(FieldError::new("image", "a photo of the pothole is required"));
    }
    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    let draft = IncidentDraft {
        description: report.description.trim().to_string(),
        severity: report.severity,
        status: Status::Pending,
        image_uri: report.image_uri,
        date: Local::now().format("%d/%m/%y").to_string(),
        location: report.coordinates.label(),
        latitude: report.coordinates.latitude,
        longitude: report.coordinates.longitude,
    };
    let incident = incidents.add(draft).await?;
    info!("Incident {} reported", incident.id);

    if let Err(e) = confirm_report(notifications, users, &incident).await {
        warn!("Incident {} saved but report follow-up failed: {}", incident.id, e);
        return Err(Error::ReportFollowUp {
            incident: Box::new(incident),
            source: Box::new(e),
        });
    }

    Ok(incident)
}

async fn confirm_report(
    notifications: &NotificationStore,
    users: &UserStore,
    incident: &Incident,
) -> Result<()> {
    // ---
    notifications
        .add(
            "Report registered",
            "Your report was received successfully!",
            NotificationType::Success,
            incident.id.clone(),
            "check-circle",
        )
        .await?;

    if users.increment_total_reports().await?.is_none() {
        debug!("No active user, report counter not incremented");
    }
    Ok(())
}

/// Outcome of [`advance_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub incident: Incident,
    pub previous: Status,
    /// Whether a notification accompanied the change.
    pub notified: bool,
}

/// Move an incident one step along its status cycle and notify about it.
///
/// Moving to in-progress or resolved emits a notification; moving back to
/// pending does not. If the notification fails the status change stays
/// persisted and [`Error::Notification`] is returned.
pub async fn advance_status(
    incidents: &IncidentStore,
    notifications: &NotificationStore,
    incident_id: &str,
) -> Result<StatusChange> {
    // ---
    let current = incidents
        .get(incident_id)
        .ok_or_else(|| Error::IncidentNotFound {
            id: incident_id.to_string(),
        })?;
    let next = current.status.next();

    let incident = incidents
        .update_status(incident_id, next)
        .await?
        .ok_or_else(|| Error::IncidentNotFound {
            id: incident_id.to_string(),
        })?;
    info!("Incident {}: {:?} -> {:?}", incident_id, current.status, next);

    let Some((message, kind, icon)) = status_message(next) else {
        return Ok(StatusChange {
            incident,
            previous: current.status,
            notified: false,
        });
    };

    if let Err(e) = notifications
        .add(
            format!("Status updated: {}", next.label()),
            message,
            kind,
            incident_id,
            icon,
        )
        .await
    {
        warn!("Incident {} status saved but notification failed: {}", incident_id, e);
        return Err(Error::Notification {
            incident_id: incident_id.to_string(),
            source: Box::new(e),
        });
    }

    Ok(StatusChange {
        incident,
        previous: current.status,
        notified: true,
    })
}

fn status_message(status: Status) -> Option<(&'static str, NotificationType, &'static str)> {
    match status {
        Status::InProgress => Some((
            "Your report was approved! Repairs are starting.",
            NotificationType::Info,
            "progress-clock",
        )),
        Status::Resolved => Some((
            "Your report was resolved! Thank you.",
            NotificationType::Success,
            "check-circle",
        )),
        Status::Pending => None,
    }
}

/// Record 1 to 5 stars for an incident. Blank comments are dropped.
pub async fn submit_rating(
    ratings: &RatingStore,
    incident_id: &str,
    stars: u8,
    comment: Option<&str>,
) -> Result<Rating> {
    // ---
    if !(1..=5).contains(&stars) {
        return Err(Error::validation("stars", "select between 1 and 5 stars"));
    }
    let comment = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    ratings.add(incident_id, stars, comment).await
}

/// Everything the registration screen collects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
    pub city: String,
}

/// Check every registration field, reporting all failures at once.
pub fn validate_registration(form: &RegistrationForm) -> Result<NewUser> {
    // ---
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "name is required"));
    } else if name.chars().count() < 3 {
        errors.push(FieldError::new("name", "name must be at least 3 characters"));
    }

    if let Some(e) = check_email(&form.email) {
        errors.push(e);
    }
    if let Some(e) = check_password_strength(&form.password) {
        errors.push(e);
    }

    if form.confirm_password.is_empty() {
        errors.push(FieldError::new("confirm_password", "confirmation is required"));
    } else if form.confirm_password != form.password {
        errors.push(FieldError::new("confirm_password", "passwords do not match"));
    }

    let phone = form.phone.trim();
    if phone.is_empty() {
        errors.push(FieldError::new("phone", "phone is required"));
    } else if phone.chars().count() < 10 {
        errors.push(FieldError::new("phone", "phone must have at least 10 digits"));
    }

    let city = form.city.trim();
    if city.is_empty() {
        errors.push(FieldError::new("city", "city is required"));
    } else if city.chars().count() < 2 {
        errors.push(FieldError::new("city", "invalid city"));
    }

    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    Ok(NewUser {
        name: name.to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
        phone: Some(phone.to_string()),
        city: Some(city.to_string()),
    })
}

/// Shape checks run before a login attempt reaches the user store.
pub fn validate_login(email: &str, password: &str) -> Result<()> {
    // ---
    let mut errors = Vec::new();
    if let Some(e) = check_email(email) {
        errors.push(e);
    }
    if password.trim().is_empty() {
        errors.push(FieldError::new("password", "password is required"));
    } else if password.chars().count() < 6 {
        errors.push(FieldError::new("password", "password must be at least 6 characters"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

fn check_email(email: &str) -> Option<FieldError> {
    // ---
    let email = email.trim();
    if email.is_empty() {
        return Some(FieldError::new("email", "email is required"));
    }
    if !is_email_shaped(email) {
        return Some(FieldError::new("email", "invalid email"));
    }
    None
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
fn is_email_shaped(email: &str) -> bool {
    // ---
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn check_password_strength(password: &str) -> Option<FieldError> {
    // ---
    let message = if password.is_empty() {
        "password is required"
    } else if password.chars().count() < 6 {
        "password must be at least 6 characters"
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        "password must contain an uppercase letter"
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        "password must contain a number"
    } else {
        return None;
    };
    Some(FieldError::new("password", message))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn create_test_form() -> RegistrationForm {
        // ---
        RegistrationForm {
            name: "Carlos Souza".to_string(),
            email: "carlos@example.com".to_string(),
            password: "Buraco123".to_string(),
            confirm_password: "Buraco123".to_string(),
            phone: "(11) 98765-4321".to_string(),
            city: "São Paulo".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        // ---
        let user = validate_registration(&create_test_form()).unwrap();
        assert_eq!(user.email, "carlos@example.com");
        assert_eq!(user.city.as_deref(), Some("São Paulo"));
    }

    #[test]
    fn test_registration_reports_every_field() {
        // ---
        let form = RegistrationForm {
            name: "Al".to_string(),
            email: "not-an-email".to_string(),
            password: "weakpass".to_string(),
            confirm_password: "different".to_string(),
            phone: "123".to_string(),
            city: String::new(),
        };
        let err = validate_registration(&form).unwrap_err();
        let fields: Vec<&str> = err.field_errors().iter().map(|e| e.field).collect();

        assert_eq!(
            fields,
            ["name", "email", "password", "confirm_password", "phone", "city"]
        );
    }

    #[test]
    fn test_password_rules() {
        // ---
        assert!(check_password_strength("Ab1").is_some());
        assert!(check_password_strength("abcdef1").is_some());
        assert!(check_password_strength("Abcdefg").is_some());
        assert!(check_password_strength("Abcdef1").is_none());
    }

    #[test]
    fn test_email_shape() {
        // ---
        assert!(is_email_shaped("a@b.co"));
        assert!(!is_email_shaped("a@b"));
        assert!(!is_email_shaped("a b@c.com"));
        assert!(!is_email_shaped("@c.com"));
        assert!(!is_email_shaped("a@@c.com"));
        assert!(!is_email_shaped("a@.com"));
    }

    #[test]
    fn test_login_validation() {
        // ---
        assert!(validate_login("admin@tapaburaco.com", "Admin@123").is_ok());
        let err = validate_login("", "123").unwrap_err();
        assert_eq!(err.field_errors().len(), 2);
    }
}
