//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Rolling availability window
pub const DEFAULT_HORIZON_DAYS: u32 = 14;

// Meeting roster limits
pub const DEFAULT_MIN_MEETING_SIZE: usize = 5;
pub const DEFAULT_MAX_MEETING_SIZE: usize = 5;

// Reminder dispatch configuration
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HOUR_BEFORE_MIN_MINUTES: i64 = 40;
pub const DEFAULT_HOUR_BEFORE_MAX_MINUTES: i64 = 80;
pub const DELIVERY_MAX_ATTEMPTS: usize = 3;
pub const DELIVERY_RETRY_BASE_MS: u64 = 1_000;

// Daily reconciliation schedule (second minute hour dom month dow)
pub const DEFAULT_RECONCILE_CRON: &str = "0 30 3 * * *";

// Service-state marker keys
pub const LAST_DAY_BEFORE_RUN_KEY: &str = "reminders.last_day_before_run";

// Database defaults
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;

// Message rendering
pub const MAX_ROSTER_PREVIEW: usize = 5;
