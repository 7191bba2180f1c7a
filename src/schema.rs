//! Persisted state layout for `pothole-tracker`.
//!
//! One value per key, each a JSON document. Collection keys hold an ordered
//! JSON array of records; the current-user key holds a single `User` or is
//! absent; statistics keys hold `{ totalReports, resolvedReports }`.
//!
//! The key names are the ones the mobile app has always used, so data written
//! by earlier builds loads unchanged.

// ---

/// Ordered sequence of `Incident`, newest first.
pub const INCIDENTS_KEY: &str = "@tapaburaco_incidents";

/// Ordered sequence of `Notification`, newest first.
pub const NOTIFICATIONS_KEY: &str = "@tapaburaco_notifications";

/// Ordered sequence of `Rating`, oldest first.
pub const RATINGS_KEY: &str = "@tapaburaco_ratings";

/// Ordered sequence of `User`, including plaintext passwords.
pub const USERS_KEY: &str = "@tapaburaco_users";

/// Snapshot of the logged-in `User`, absent when nobody is logged in.
pub const CURRENT_USER_KEY: &str = "@tapaburaco_current_user";

const USER_STATS_PREFIX: &str = "@tapaburaco_user_stats";

/// Statistics key for one user.
pub fn user_stats_key(user_id: &str) -> String {
    // ---
    format!("{USER_STATS_PREFIX}_{user_id}")
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_user_stats_key_is_parameterized_by_id() {
        // ---
        assert_eq!(user_stats_key("admin-001"), "@tapaburaco_user_stats_admin-001");
        assert_ne!(user_stats_key("a"), user_stats_key("b"));
    }
}
