//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ROUNDTABLE_DB_PATH`: Database file path (required for env loading)
//! - `ROUNDTABLE_DB_POOL_SIZE`: Connection pool size
//! - `ROUNDTABLE_GATEWAY_URL`: Notification gateway base URL (required)
//! - `ROUNDTABLE_GATEWAY_TOKEN`: Bearer token for the gateway
//! - `ROUNDTABLE_POLL_INTERVAL`: Reminder poll interval in seconds
//! - `ROUNDTABLE_HORIZON_DAYS`: Availability window length in days
//! - `ROUNDTABLE_RECONCILE_CRON`: Cron expression for the daily rebuild
//! - `ROUNDTABLE_DAY_BEFORE_ENABLED` / `ROUNDTABLE_HOUR_BEFORE_ENABLED`:
//!   reminder kind toggles (true/false)
//! - `ROUNDTABLE_MAX_MEETING_SIZE` / `ROUNDTABLE_MIN_MEETING_SIZE`
//!
//! ## File Locations
//! The loader probes `config.{toml,json}` and `roundtable.{toml,json}` in
//! the working directory, its parents (2 levels), and next to the
//! executable.

use std::path::{Path, PathBuf};

use roundtable_domain::{Config, Result, RoundtableError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RoundtableError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `ROUNDTABLE_DB_PATH` and `ROUNDTABLE_GATEWAY_URL` must be present; all
/// other settings fall back to their defaults when unset.
///
/// # Errors
/// Returns `RoundtableError::Config` if required variables are missing or
/// any present variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("ROUNDTABLE_DB_PATH")?;
    config.gateway.base_url = env_var("ROUNDTABLE_GATEWAY_URL")?;
    config.gateway.auth_token = std::env::var("ROUNDTABLE_GATEWAY_TOKEN").ok();

    if let Some(value) = env_parse::<u32>("ROUNDTABLE_DB_POOL_SIZE")? {
        config.database.pool_size = value;
    }
    if let Some(value) = env_parse::<u64>("ROUNDTABLE_POLL_INTERVAL")? {
        config.scheduler.poll_interval_seconds = value;
    }
    if let Some(value) = env_parse::<u32>("ROUNDTABLE_HORIZON_DAYS")? {
        config.scheduler.horizon_days = value;
    }
    if let Ok(value) = std::env::var("ROUNDTABLE_RECONCILE_CRON") {
        config.scheduler.reconcile_cron = value;
    }
    if let Some(value) = env_parse::<usize>("ROUNDTABLE_MAX_MEETING_SIZE")? {
        config.meetings.max_size = value;
    }
    if let Some(value) = env_parse::<usize>("ROUNDTABLE_MIN_MEETING_SIZE")? {
        config.meetings.min_size = value;
    }
    config.scheduler.day_before_enabled =
        env_bool("ROUNDTABLE_DAY_BEFORE_ENABLED", config.scheduler.day_before_enabled);
    config.scheduler.hour_before_enabled =
        env_bool("ROUNDTABLE_HOUR_BEFORE_ENABLED", config.scheduler.hour_before_enabled);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RoundtableError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RoundtableError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RoundtableError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RoundtableError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RoundtableError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RoundtableError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(RoundtableError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.toml", "config.json", "roundtable.toml", "roundtable.json"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        for base in ["", "..", "../.."] {
            for name in names {
                candidates.push(cwd.join(base).join(name));
            }
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            for name in names {
                candidates.push(exe_dir.join(name));
            }
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        RoundtableError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable; an unset variable is `None`, a
/// present-but-invalid one is an error.
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| RoundtableError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
