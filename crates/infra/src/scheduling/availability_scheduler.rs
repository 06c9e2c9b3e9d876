//! Availability scheduler - the daily cron job rebuilding the rolling
//! window.
//!
//! Runs [`AvailabilityService::reconcile`] on a cron schedule (03:30 by
//! default, when nobody is browsing dates). A failed run leaves the previous
//! window authoritative; the next scheduled run retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use roundtable_core::AvailabilityService;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the availability scheduler.
#[derive(Debug, Clone)]
pub struct AvailabilitySchedulerConfig {
    /// Cron expression describing the execution schedule
    /// (second minute hour day-of-month month day-of-week).
    pub cron_expression: String,
    /// Timeout applied to a single reconciliation run.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for AvailabilitySchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 30 3 * * *".into(), // daily at 03:30
            job_timeout: Duration::from_secs(120),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Availability scheduler with explicit lifecycle management.
pub struct AvailabilityScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: AvailabilitySchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    service: Arc<AvailabilityService>,
}

impl AvailabilityScheduler {
    /// Create a scheduler with a custom configuration.
    pub async fn with_config(
        config: AvailabilitySchedulerConfig,
        service: Arc<AvailabilityService>,
    ) -> SchedulerResult<Self> {
        let raw_scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed { source })?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            service,
        };

        scheduler.job_id = scheduler.register_reconcile_job().await?;
        Ok(scheduler)
    }

    /// Create a scheduler with the given cron expression.
    pub async fn new(
        cron_expression: String,
        service: Arc<AvailabilityService>,
    ) -> SchedulerResult<Self> {
        let config = AvailabilitySchedulerConfig { cron_expression, ..Default::default() };
        Self::with_config(config, service).await
    }

    /// Start the scheduler, spawning the monitoring task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        let start_result = tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?;

        start_result.map_err(|source| SchedulerError::StartFailed { source })?;

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("Availability scheduler monitor cancelled");
        });

        self.monitor_handle = Some(handle);
        info!(cron = %self.config.cron_expression, "Availability scheduler started");
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        let stop_result = tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?;

        stop_result.map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??
        }

        info!("Availability scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when the monitor task is active.
    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().map_or(false, |handle| !handle.is_finished())
    }

    /// Run one reconciliation immediately, for an external cron trigger.
    pub async fn run_once(&self) -> SchedulerResult<()> {
        Self::reconcile_now(&self.service, self.config.job_timeout).await;
        Ok(())
    }

    async fn register_reconcile_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let cron_expr = self.config.cron_expression.clone();
        let service = self.service.clone();
        let job_timeout = self.config.job_timeout;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let service = service.clone();
            Box::pin(async move {
                Self::reconcile_now(&service, job_timeout).await;
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job_definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered reconciliation job");
        Ok(job_id)
    }

    async fn reconcile_now(service: &Arc<AvailabilityService>, job_timeout: Duration) {
        let today = Local::now().date_naive();
        match tokio::time::timeout(job_timeout, service.reconcile(today)).await {
            Ok(Ok(rows)) => {
                debug!(window_rows = rows, "Availability reconciliation finished");
            }
            Ok(Err(err)) => {
                // The previous window stays authoritative until the next run.
                error!(error = %err, "Availability reconciliation failed");
            }
            Err(_) => {
                warn!(timeout_secs = job_timeout.as_secs(), "Availability reconciliation timed out");
            }
        }
    }
}

impl Drop for AvailabilityScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AvailabilityScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
