//! Application configuration structures
//!
//! Loaded by the infrastructure config loader from environment variables or
//! a TOML/JSON file. Every field carries a serde default so partial files
//! stay valid.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_HORIZON_DAYS, DEFAULT_HOUR_BEFORE_MAX_MINUTES,
    DEFAULT_HOUR_BEFORE_MIN_MINUTES, DEFAULT_MAX_MEETING_SIZE, DEFAULT_MIN_MEETING_SIZE,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RECONCILE_CRON,
};

/// Top-level configuration for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub meetings: MeetingPolicy,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// SQLite database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path(), pool_size: default_pool_size() }
    }
}

/// Background scheduling settings for reconciliation and reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between reminder poll cycles, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Forward horizon of the availability window, in days.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Lower edge of the hour-before due band, minutes before start.
    #[serde(default = "default_hour_before_min")]
    pub hour_before_min_minutes: i64,
    /// Upper edge of the hour-before due band, minutes before start.
    #[serde(default = "default_hour_before_max")]
    pub hour_before_max_minutes: i64,
    /// Cron expression for the daily availability reconciliation.
    #[serde(default = "default_reconcile_cron")]
    pub reconcile_cron: String,
    #[serde(default = "default_true")]
    pub day_before_enabled: bool,
    #[serde(default = "default_true")]
    pub hour_before_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            horizon_days: default_horizon_days(),
            hour_before_min_minutes: default_hour_before_min(),
            hour_before_max_minutes: default_hour_before_max(),
            reconcile_cron: default_reconcile_cron(),
            day_before_enabled: true,
            hour_before_enabled: true,
        }
    }
}

/// Meeting roster policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingPolicy {
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

impl Default for MeetingPolicy {
    fn default() -> Self {
        Self { min_size: default_min_size(), max_size: default_max_size() }
    }
}

/// Notification gateway endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_gateway_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            auth_token: None,
            timeout_seconds: default_gateway_timeout(),
        }
    }
}

fn default_db_path() -> String {
    "roundtable.db".to_string()
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_hour_before_min() -> i64 {
    DEFAULT_HOUR_BEFORE_MIN_MINUTES
}

fn default_hour_before_max() -> i64 {
    DEFAULT_HOUR_BEFORE_MAX_MINUTES
}

fn default_reconcile_cron() -> String {
    DEFAULT_RECONCILE_CRON.to_string()
}

fn default_min_size() -> usize {
    DEFAULT_MIN_MEETING_SIZE
}

fn default_max_size() -> usize {
    DEFAULT_MAX_MEETING_SIZE
}

fn default_gateway_url() -> String {
    "http://localhost:8099".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}
