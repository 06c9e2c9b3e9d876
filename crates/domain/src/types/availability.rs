//! Concrete calendar occurrences of recurring slots within the rolling
//! window.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One concrete calendar occurrence of a recurring slot, as produced by the
/// calendar projection. Pure value; carries the slot start time only so that
/// projections have a stable ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOccurrence {
    pub date: NaiveDate,
    pub slot_id: Uuid,
    pub start_time: NaiveTime,
}

/// Persisted bookable occurrence. Unique per (date, slot).
///
/// `is_available` survives reconciliation: a date an administrator disabled
/// stays disabled when the window is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableDate {
    pub id: Uuid,
    pub date: NaiveDate,
    pub slot_id: Uuid,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
