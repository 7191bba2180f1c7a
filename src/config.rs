//! Configuration loader for `pothole-tracker`.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller), so `env::var` calls stay out of the stores.
//!
use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse an optional boolean environment variable with a default value.
macro_rules! parse_env_bool {
    ($var_name:expr, $default:expr) => {
        match env::var($var_name).ok().as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => $default,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => return Err(anyhow!("Invalid {}: '{}'", $var_name, other)),
        }
    };
}

pub const DEFAULT_STORAGE_DIR: &str = "./data";
pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 10;

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // ---
    /// Directory holding one JSON file per storage key.
    pub storage_dir: PathBuf,

    /// How long to wait for a device location fix before falling back.
    pub location_timeout: Duration,

    /// Whether to create the administrator account at startup.
    pub seed_admin: bool,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `POTHOLE_STORAGE_DIR` – storage directory (default: `./data`)
/// - `LOCATION_TIMEOUT_SECS` – location fix timeout (default: 10)
/// - `SEED_ADMIN` – seed the administrator account (default: true)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let storage_dir = env::var("POTHOLE_STORAGE_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string());
    let location_timeout_secs = parse_env_u64!("LOCATION_TIMEOUT_SECS", DEFAULT_LOCATION_TIMEOUT_SECS);
    let seed_admin = parse_env_bool!("SEED_ADMIN", true);

    if location_timeout_secs == 0 {
        return Err(anyhow!("LOCATION_TIMEOUT_SECS must be greater than 0"));
    }

    Ok(Config {
        storage_dir: PathBuf::from(storage_dir),
        location_timeout: Duration::from_secs(location_timeout_secs),
        seed_admin,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  POTHOLE_STORAGE_DIR   : {}", self.storage_dir.display());
        tracing::info!("  LOCATION_TIMEOUT_SECS : {}", self.location_timeout.as_secs());
        tracing::info!("  SEED_ADMIN            : {}", self.seed_admin);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; tests touching them take turns.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        // ---
        for var in ["POTHOLE_STORAGE_DIR", "LOCATION_TIMEOUT_SECS", "SEED_ADMIN"] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        // ---
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cfg = load_from_env().unwrap();
        assert_eq!(cfg.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        assert_eq!(cfg.location_timeout, Duration::from_secs(10));
        assert!(cfg.seed_admin);
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        // ---
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("POTHOLE_STORAGE_DIR", "/tmp/potholes");
        env::set_var("LOCATION_TIMEOUT_SECS", "3");
        env::set_var("SEED_ADMIN", "No");
        let cfg = load_from_env().unwrap();
        assert_eq!(cfg.storage_dir, PathBuf::from("/tmp/potholes"));
        assert_eq!(cfg.location_timeout, Duration::from_secs(3));
        assert!(!cfg.seed_admin);

        env::set_var("LOCATION_TIMEOUT_SECS", "soon");
        assert!(load_from_env().is_err());

        env::set_var("LOCATION_TIMEOUT_SECS", "0");
        assert!(load_from_env().is_err());

        env::set_var("LOCATION_TIMEOUT_SECS", "3");
        env::set_var("SEED_ADMIN", "maybe");
        assert!(load_from_env().is_err());

        clear_env();
    }
}
