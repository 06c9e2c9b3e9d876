//! Availability and slot-definition commands

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveTime};
use roundtable_domain::{AvailableDate, RecurringSlot, Result, RoundtableError, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::logging::log_command_execution;
use crate::AppContext;

/// Create-slot request as sent by the admin front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    /// Weekday name, e.g. `Wednesday`.
    pub day_of_week: String,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub city: String,
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| RoundtableError::Validation(format!("invalid time '{value}', expected HH:MM")))
}

/// Define a new recurring weekly slot.
pub async fn create_slot(
    ctx: &Arc<AppContext>,
    request: CreateSlotRequest,
) -> Result<RecurringSlot> {
    let start = Instant::now();
    let result = async {
        let day = request
            .day_of_week
            .parse::<Weekday>()
            .map_err(RoundtableError::Validation)?;
        let slot = RecurringSlot::new(
            day,
            parse_time(&request.start_time)?,
            parse_time(&request.end_time)?,
            request.city,
        )?;
        ctx.slots.insert_slot(&slot).await?;
        Ok(slot)
    }
    .await;
    log_command_execution("availability::create_slot", start.elapsed(), result.is_ok());
    result
}

/// Activate or deactivate a slot definition.
pub async fn set_slot_active(ctx: &Arc<AppContext>, slot_id: Uuid, active: bool) -> Result<()> {
    let start = Instant::now();
    let result = ctx.slots.set_slot_active(slot_id, active).await;
    log_command_execution("availability::set_slot_active", start.elapsed(), result.is_ok());
    result
}

/// Active slot definitions, in canonical weekday order.
pub async fn list_slots(ctx: &Arc<AppContext>) -> Result<Vec<RecurringSlot>> {
    let start = Instant::now();
    let result = ctx.slots.list_active_slots().await;
    log_command_execution("availability::list_slots", start.elapsed(), result.is_ok());
    result
}

/// Bookable dates currently inside the rolling window.
pub async fn list_available_dates(ctx: &Arc<AppContext>) -> Result<Vec<AvailableDate>> {
    let start = Instant::now();
    let result = ctx.availability.list_window(Local::now().date_naive()).await;
    log_command_execution("availability::list_dates", start.elapsed(), result.is_ok());
    result
}

/// Manually enable or disable one bookable date.
pub async fn set_date_availability(
    ctx: &Arc<AppContext>,
    date_id: Uuid,
    available: bool,
) -> Result<()> {
    let start = Instant::now();
    let result = if available {
        ctx.availability.mark_available(date_id).await
    } else {
        ctx.availability.mark_unavailable(date_id).await
    };
    log_command_execution("availability::set_date", start.elapsed(), result.is_ok());
    result
}
