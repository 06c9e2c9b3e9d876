//! Application context - dependency injection container
//!
//! Built once at process start: config → database manager → repositories →
//! services → schedulers. Every component receives its dependencies
//! explicitly; nothing reaches for module-level state.

use std::sync::Arc;
use std::time::Duration;

use roundtable_core::{
    ApplicationService, AvailabilityService, MeetingService, NotificationGateway, ReminderService,
    ReminderServiceConfig, SlotRepository,
};
use roundtable_domain::{Config, Result, RoundtableError};
use roundtable_infra::database::{
    DbManager, SqliteApplicationRepository, SqliteAvailabilityStore, SqliteMeetingRepository,
    SqliteReminderLedger, SqliteServiceState, SqliteSlotRepository,
};
use roundtable_infra::notify::{HttpNotificationGateway, HttpNotificationGatewayConfig};
use roundtable_infra::scheduling::{
    AvailabilityScheduler, AvailabilitySchedulerConfig, ReminderScheduler,
    ReminderSchedulerConfig,
};
use tokio::sync::Mutex;
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub slots: Arc<dyn SlotRepository>,
    pub applications: Arc<ApplicationService>,
    pub meetings: Arc<MeetingService>,
    pub availability: Arc<AvailabilityService>,
    pub reminders: Arc<ReminderService>,

    reminder_scheduler: Mutex<ReminderScheduler>,
    availability_scheduler: Mutex<AvailabilityScheduler>,
}

impl AppContext {
    /// Create a new application context from configuration.
    ///
    /// Opens the database, runs migrations, and wires all services. The
    /// background schedulers are constructed but not started; call
    /// [`AppContext::start_schedulers`] for the in-process timer mode.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let gateway: Arc<dyn NotificationGateway> = Arc::new(HttpNotificationGateway::new(
            HttpNotificationGatewayConfig::from(&config.gateway),
        )?);

        let slots: Arc<dyn SlotRepository> =
            Arc::new(SqliteSlotRepository::new(Arc::clone(&db)));
        let availability_store = Arc::new(SqliteAvailabilityStore::new(Arc::clone(&db)));
        let application_repo = Arc::new(SqliteApplicationRepository::new(Arc::clone(&db)));
        let meeting_repo = Arc::new(SqliteMeetingRepository::new(Arc::clone(&db)));
        let ledger = Arc::new(SqliteReminderLedger::new(Arc::clone(&db)));
        let state = Arc::new(SqliteServiceState::new(Arc::clone(&db)));

        let applications = Arc::new(ApplicationService::new(
            application_repo,
            Arc::clone(&slots),
            Arc::clone(&gateway),
        ));
        let meetings = Arc::new(MeetingService::new(
            meeting_repo.clone(),
            Arc::clone(&gateway),
            config.meetings.clone(),
        ));
        let availability = Arc::new(AvailabilityService::new(
            Arc::clone(&slots),
            availability_store,
            config.scheduler.horizon_days,
        ));
        let reminders = Arc::new(ReminderService::new(
            meeting_repo,
            ledger,
            state,
            gateway,
            ReminderServiceConfig::from(&config.scheduler),
        ));

        let reminder_scheduler = ReminderScheduler::new(
            Arc::clone(&reminders),
            Arc::clone(&meetings),
            ReminderSchedulerConfig {
                poll_interval: Duration::from_secs(config.scheduler.poll_interval_seconds.max(1)),
                ..Default::default()
            },
        );

        let availability_scheduler = AvailabilityScheduler::with_config(
            AvailabilitySchedulerConfig {
                cron_expression: config.scheduler.reconcile_cron.clone(),
                ..Default::default()
            },
            Arc::clone(&availability),
        )
        .await
        .map_err(RoundtableError::from)?;

        info!("application context initialised");

        Ok(Self {
            config,
            db,
            slots,
            applications,
            meetings,
            availability,
            reminders,
            reminder_scheduler: Mutex::new(reminder_scheduler),
            availability_scheduler: Mutex::new(availability_scheduler),
        })
    }

    /// Start both background schedulers (in-process timer mode).
    pub async fn start_schedulers(&self) -> Result<()> {
        self.reminder_scheduler.lock().await.start().await.map_err(RoundtableError::from)?;
        self.availability_scheduler.lock().await.start().await.map_err(RoundtableError::from)?;
        Ok(())
    }

    /// Stop both schedulers, letting in-flight cycles finish.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down");
        self.reminder_scheduler.lock().await.stop().await.map_err(RoundtableError::from)?;
        self.availability_scheduler.lock().await.stop().await.map_err(RoundtableError::from)?;
        Ok(())
    }

    /// Run one availability reconciliation, for an external cron.
    pub async fn reconcile_once(&self) -> Result<()> {
        self.availability_scheduler.lock().await.run_once().await.map_err(RoundtableError::from)
    }

    /// Run one reminder dispatch cycle, for an external cron.
    pub async fn dispatch_once(&self) -> Result<()> {
        self.reminder_scheduler.lock().await.run_once().await.map_err(RoundtableError::from)
    }
}
