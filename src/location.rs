//! Device location acquisition for the report workflow.
//!
//! The platform supplies a [`LocationProvider`]. [`acquire_location`] races
//! it against a timer and falls back to a fixed default coordinate when the
//! fix times out, permission is denied, or the provider fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::Config;

// ---

/// Coordinate used when no fix can be obtained.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    latitude: -23.5505,
    longitude: -46.6333,
    accuracy: None,
};

pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when the platform reports one.
    pub accuracy: Option<f64>,
}

impl Coordinates {
    /// Approximate address label used on new incidents.
    pub fn label(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("location fix timed out after {0:?}")]
    Timeout(Duration),
}

/// Host-platform source of device coordinates.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Result of [`acquire_location`]: always carries usable coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// Why the default coordinate was used, if it was.
    pub error: Option<LocationError>,
}

impl LocationFix {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Ask `provider` for a fix, giving up after `timeout`.
pub async fn acquire_location(provider: &dyn LocationProvider, timeout: Duration) -> LocationFix {
    // ---
    let outcome = match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(timeout)),
    };

    match outcome {
        Ok(coordinates) => LocationFix {
            coordinates,
            error: None,
        },
        Err(e) => {
            warn!("Location fix failed, using default coordinates: {}", e);
            LocationFix {
                coordinates: DEFAULT_COORDINATES,
                error: Some(e),
            }
        }
    }
}

/// A provider paired with the fix timeout to apply on every request.
#[derive(Clone)]
pub struct Locator {
    provider: Arc<dyn LocationProvider>,
    timeout: Duration,
}

impl Locator {
    pub fn new(provider: Arc<dyn LocationProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Use the timeout from `LOCATION_TIMEOUT_SECS`.
    pub fn from_config(provider: Arc<dyn LocationProvider>, cfg: &Config) -> Self {
        Self::new(provider, cfg.location_timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn locate(&self) -> LocationFix {
        acquire_location(self.provider.as_ref(), self.timeout).await
    }
}

/// Provider returning the same coordinates every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}
