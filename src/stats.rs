//! Derived views over the incident collection.
//!
//! Pure functions; the stores stay ignorant of how screens slice their data.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::models::{Incident, Severity, Status};

// ---

/// Counts and rates shown on the statistics and dashboard screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncidentSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    /// Resolved share of all incidents, rounded percent.
    pub resolution_rate: u32,
    /// Mean whole days since creation over resolved incidents, rounded.
    pub avg_resolution_days: u32,
}

/// Summarize `incidents` as of `now`.
pub fn summarize(incidents: &[Incident], now: DateTime<Utc>) -> IncidentSummary {
    // ---
    let count_status = |s: Status| incidents.iter().filter(|i| i.status == s).count();
    let count_severity = |s: Severity| incidents.iter().filter(|i| i.severity == s).count();

    let total = incidents.len();
    let resolved = count_status(Status::Resolved);

    let summary = IncidentSummary {
        total,
        pending: count_status(Status::Pending),
        in_progress: count_status(Status::InProgress),
        resolved,
        low: count_severity(Severity::Low),
        medium: count_severity(Severity::Medium),
        high: count_severity(Severity::High),
        resolution_rate: percent(resolved, total),
        avg_resolution_days: avg_resolution_days(incidents, now),
    };
    debug!("Summary: {:?}", summary);
    summary
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

fn avg_resolution_days(incidents: &[Incident], now: DateTime<Utc>) -> u32 {
    // ---
    // Unparseable timestamps count as zero days rather than skewing the count.
    let days: Vec<i64> = incidents
        .iter()
        .filter(|i| i.status == Status::Resolved)
        .map(|i| {
            DateTime::parse_from_rfc3339(&i.created_at)
                .map(|created| (now - created.with_timezone(&Utc)).num_days().max(0))
                .unwrap_or(0)
        })
        .collect();

    if days.is_empty() {
        return 0;
    }
    (days.iter().sum::<i64>() as f64 / days.len() as f64).round() as u32
}

/// Incidents with `status`, or all of them when `status` is `None`.
pub fn filter_by_status(incidents: &[Incident], status: Option<Status>) -> Vec<Incident> {
    incidents
        .iter()
        .filter(|i| status.map_or(true, |s| i.status == s))
        .cloned()
        .collect()
}

/// Sort newest first by creation timestamp.
///
/// ISO-8601 UTC strings of equal precision order lexically, which is how the
/// store writes them; the sort is stable for ties.
pub fn sort_newest_first(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn create_test_incident(id: &str, status: Status, severity: Severity, created_at: &str) -> Incident {
        // ---
        Incident {
            id: id.to_string(),
            description: "Pothole near the school gate".to_string(),
            severity,
            status,
            image_uri: None,
            date: "01/03/25".to_string(),
            location: "-23.5505, -46.6333".to_string(),
            latitude: -23.5505,
            longitude: -46.6333,
            created_at: created_at.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_summary_counts() {
        // ---
        let incidents = vec![
            create_test_incident("1", Status::Pending, Severity::High, "2025-03-10T12:00:00.000Z"),
            create_test_incident("2", Status::Resolved, Severity::Low, "2025-03-01T12:00:00.000Z"),
            create_test_incident("3", Status::Resolved, Severity::Low, "2025-03-07T12:00:00.000Z"),
            create_test_incident("4", Status::InProgress, Severity::Medium, "2025-03-09T12:00:00.000Z"),
        ];

        let summary = summarize(&incidents, now());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.low, 2);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.resolution_rate, 50);
        // (10 + 4) / 2
        assert_eq!(summary.avg_resolution_days, 7);
    }

    #[test]
    fn test_empty_summary_is_zeroed() {
        // ---
        assert_eq!(summarize(&[], now()), IncidentSummary::default());
    }

    #[test]
    fn test_filter_and_sort() {
        // ---
        let mut incidents = vec![
            create_test_incident("old", Status::Pending, Severity::Low, "2025-01-01T00:00:00.000Z"),
            create_test_incident("new", Status::Pending, Severity::Low, "2025-02-01T00:00:00.000Z"),
            create_test_incident("done", Status::Resolved, Severity::Low, "2025-01-15T00:00:00.000Z"),
        ];

        assert_eq!(filter_by_status(&incidents, None).len(), 3);
        assert_eq!(filter_by_status(&incidents, Some(Status::Pending)).len(), 2);

        sort_newest_first(&mut incidents);
        let ids: Vec<&str> = incidents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["new", "done", "old"]);
    }
}
