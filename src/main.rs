//! Process-start entry point for `pothole-tracker`.
//!
//! This binary runs the startup routine the mobile shell performs before the
//! first screen renders:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the on-disk key-value storage
//! - Seeding the administrator account if it is absent (idempotent)
//! - Loading every store and logging a summary of their state
//!
//! # Environment Variables
//! - `POTHOLE_STORAGE_DIR` (optional) – storage directory (default: `./data`)
//! - `LOCATION_TIMEOUT_SECS` (optional) – location fix timeout (default: 10)
//! - `SEED_ADMIN` (optional) – seed the administrator account (default: true)
//! - `POTHOLE_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `POTHOLE_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use pothole_tracker::{
    config, stats, FileStorage, IncidentStore, KeyValueStore, NotificationStore, RatingStore,
    UserStore,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let storage: Arc<dyn KeyValueStore> = Arc::new(
        FileStorage::open(cfg.storage_dir.clone())
            .await
            .with_context(|| format!("Failed to open storage at '{}'", cfg.storage_dir.display()))?,
    );

    let users = UserStore::new(storage.clone());
    if cfg.seed_admin {
        users
            .seed_admin_if_absent()
            .await
            .context("Failed to seed administrator account")?;
    }

    let incidents = IncidentStore::new(storage.clone());
    let notifications = NotificationStore::new(storage.clone());
    let ratings = RatingStore::new(storage);

    let loaded = incidents.load().await;
    notifications.load().await;
    ratings.load().await;
    let current = users.load_current().await;

    for (name, err) in [
        ("incidents", incidents.last_error()),
        ("notifications", notifications.last_error()),
        ("ratings", ratings.last_error()),
        ("users", users.last_error()),
    ] {
        if let Some(err) = err {
            tracing::error!("Failed to load {}: {}", name, err);
        }
    }

    let summary = stats::summarize(&loaded, Utc::now());
    tracing::info!(
        "Incidents: {} total, {} pending, {} in progress, {} resolved ({}% resolved)",
        summary.total,
        summary.pending,
        summary.in_progress,
        summary.resolved,
        summary.resolution_rate
    );
    tracing::info!(
        "Notifications: {} unread; ratings average {:.1}",
        notifications.unread_count(),
        ratings.average()
    );
    match current {
        Some(user) => tracing::info!("Logged in as {} <{}>", user.name, user.email),
        None => tracing::info!("No user logged in"),
    }

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `POTHOLE_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `POTHOLE_LOG_LEVEL` env var
///
/// This should be called once at startup before any logging macros are
/// invoked. It installs the subscriber globally for the process lifetime.
fn init_tracing() {
    // ---
    let span_events = match env::var("POTHOLE_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("POTHOLE_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
