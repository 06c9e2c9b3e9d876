//! Scheduling infrastructure for automated task execution
//!
//! Two background drivers run the core:
//! - The reminder scheduler: an interval poll loop for reminder dispatch and
//!   the past-meeting sweep
//! - The availability scheduler: a daily cron job rebuilding the rolling
//!   availability window
//!
//! Both follow the same runtime rules: explicit start/stop lifecycle,
//! tracked join handles, cancellation tokens, and timeouts around every
//! cycle. Both also expose `run_once` so an external cron can drive them
//! instead of the in-process timer.

pub mod availability_scheduler;
pub mod error;
pub mod reminder_scheduler;

pub use availability_scheduler::{AvailabilityScheduler, AvailabilitySchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use reminder_scheduler::{ReminderScheduler, ReminderSchedulerConfig};
