//! Daily reconciliation of the rolling availability window.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use roundtable_domain::{AvailableDate, Result, RoundtableError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar;
use crate::ports::{AvailabilityStore, SlotRepository};

/// Keeps the persisted `[today, today + horizon]` window aligned with the
/// active recurring slots.
pub struct AvailabilityService {
    slots: Arc<dyn SlotRepository>,
    store: Arc<dyn AvailabilityStore>,
    horizon_days: u32,
}

impl AvailabilityService {
    pub fn new(
        slots: Arc<dyn SlotRepository>,
        store: Arc<dyn AvailabilityStore>,
        horizon_days: u32,
    ) -> Self {
        Self { slots, store, horizon_days }
    }

    /// Rebuild the window for `today`. Idempotent; safe to run more than
    /// once per day. On failure the previously persisted window stays
    /// authoritative until the next scheduled run.
    pub async fn reconcile(&self, today: NaiveDate) -> Result<usize> {
        let slots = self.slots.list_active_slots().await?;
        if slots.is_empty() {
            warn!("no active recurring slots; availability window will be empty");
        }

        let occurrences = calendar::project(&slots, today, self.horizon_days);
        let count = self
            .store
            .reconcile_window(today, self.horizon_days, occurrences)
            .await
            .map_err(|err| RoundtableError::Reconciliation(err.to_string()))?;

        info!(window_rows = count, horizon_days = self.horizon_days, "availability window reconciled");
        Ok(count)
    }

    /// Bookable dates currently inside the window.
    pub async fn list_window(&self, today: NaiveDate) -> Result<Vec<AvailableDate>> {
        let end = today + Duration::days(i64::from(self.horizon_days));
        self.store.list_available(today, end).await
    }

    /// Manually disable one occurrence (it will stay disabled across
    /// reconciliations).
    pub async fn mark_unavailable(&self, date_id: Uuid) -> Result<()> {
        self.store.set_availability(date_id, false).await
    }

    /// Re-enable a previously disabled occurrence.
    pub async fn mark_available(&self, date_id: Uuid) -> Result<()> {
        self.store.set_availability(date_id, true).await
    }
}
