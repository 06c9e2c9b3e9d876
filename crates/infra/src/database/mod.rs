//! Database implementations

pub mod application_repository;
pub mod availability_repository;
pub(crate) mod codec;
pub mod manager;
pub mod meeting_repository;
pub mod reminder_ledger_repository;
pub mod service_state_repository;
pub mod slot_repository;

pub use application_repository::SqliteApplicationRepository;
pub use availability_repository::SqliteAvailabilityStore;
pub use manager::DbManager;
pub use meeting_repository::SqliteMeetingRepository;
pub use reminder_ledger_repository::SqliteReminderLedger;
pub use service_state_repository::SqliteServiceState;
pub use slot_repository::SqliteSlotRepository;

use roundtable_domain::RoundtableError;

use crate::errors::InfraError;

pub(crate) fn map_sql_error(err: rusqlite::Error) -> RoundtableError {
    RoundtableError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: tokio::task::JoinError) -> RoundtableError {
    RoundtableError::Internal(format!("blocking task join failed: {err}"))
}
