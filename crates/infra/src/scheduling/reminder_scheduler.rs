//! Reminder scheduler - the periodic poll loop driving reminder dispatch.
//!
//! Wakes every `poll_interval` (5 minutes by default), runs one reminder
//! cycle plus the past-meeting sweep, and goes back to sleep. Stopping the
//! scheduler lets an in-flight cycle finish before the task exits, so no
//! reminder state is left half-updated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use roundtable_core::{MeetingService, ReminderService};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the reminder scheduler
#[derive(Debug, Clone)]
pub struct ReminderSchedulerConfig {
    /// Interval between poll cycles
    pub poll_interval: Duration,
    /// Timeout for a single cycle
    pub cycle_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for ReminderSchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            cycle_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Reminder scheduler with explicit lifecycle management.
pub struct ReminderScheduler {
    reminders: Arc<ReminderService>,
    meetings: Arc<MeetingService>,
    config: ReminderSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ReminderScheduler {
    pub fn new(
        reminders: Arc<ReminderService>,
        meetings: Arc<MeetingService>,
        config: ReminderSchedulerConfig,
    ) -> Self {
        Self {
            reminders,
            meetings,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scheduler, spawning the background poll loop.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting reminder scheduler");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let reminders = Arc::clone(&self.reminders);
        let meetings = Arc::clone(&self.meetings);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(reminders, meetings, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Reminder scheduler started"
        );
        Ok(())
    }

    /// Stop the scheduler gracefully: the in-flight cycle finishes first.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping reminder scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Reminder scheduler stopped");
        Ok(())
    }

    /// Check if the scheduler is running.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run a single cycle immediately, for an external cron trigger.
    pub async fn run_once(&self) -> SchedulerResult<()> {
        Self::run_cycle(&self.reminders, &self.meetings).await;
        Ok(())
    }

    /// Background poll loop.
    async fn poll_loop(
        reminders: Arc<ReminderService>,
        meetings: Arc<MeetingService>,
        config: ReminderSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Reminder poll loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.poll_interval) => {
                    match tokio::time::timeout(
                        config.cycle_timeout,
                        Self::run_cycle(&reminders, &meetings),
                    )
                    .await
                    {
                        Ok(()) => {}
                        Err(_) => {
                            warn!(
                                timeout_secs = config.cycle_timeout.as_secs(),
                                "Reminder cycle timed out"
                            );
                        }
                    }
                }
            }
        }
    }

    /// One poll cycle: dispatch due reminders, then sweep past meetings.
    /// Errors are logged, never propagated into the loop.
    async fn run_cycle(reminders: &Arc<ReminderService>, meetings: &Arc<MeetingService>) {
        let now = Local::now().naive_local();

        match reminders.run_cycle(now).await {
            Ok(report) if report.skipped_overlap => {
                warn!("Reminder cycle skipped: previous cycle still in flight");
            }
            Ok(report) => {
                debug!(
                    day_before = report.day_before_sent,
                    hour_before = report.hour_before_sent,
                    failures = report.failures,
                    "Reminder cycle finished"
                );
            }
            Err(e) => {
                error!(error = %e, "Reminder cycle failed");
            }
        }

        match meetings.sweep_past(now.date()).await {
            Ok(0) => {}
            Ok(swept) => info!(swept, "Past meetings closed out"),
            Err(e) => error!(error = %e, "Past-meeting sweep failed"),
        }
    }
}

/// Ensure the loop is cancelled when the scheduler is dropped.
impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            warn!("ReminderScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
