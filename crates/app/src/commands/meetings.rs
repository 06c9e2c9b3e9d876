//! Meeting commands
//!
//! Dates and times arrive from the front-end as strings and are validated
//! here; everything past this boundary works with typed values.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate, NaiveTime};
use roundtable_core::NewMeeting;
use roundtable_domain::{
    Meeting, MeetingMember, MeetingStatus, Result, RoundtableError, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::logging::log_command_execution;
use crate::AppContext;

/// Create-meeting request as sent by the admin front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeetingRequest {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub city: String,
    pub venue: String,
    pub venue_address: Option<String>,
    pub created_by: Option<UserId>,
}

/// A meeting together with its roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDetails {
    pub meeting: Meeting,
    pub members: Vec<MeetingMember>,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| RoundtableError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| RoundtableError::Validation(format!("invalid time '{value}', expected HH:MM")))
}

/// Create a meeting in the planned state.
pub async fn create_meeting(
    ctx: &Arc<AppContext>,
    request: CreateMeetingRequest,
) -> Result<Meeting> {
    let start = Instant::now();
    let result = async {
        let new = NewMeeting {
            name: request.name,
            date: parse_date(&request.date)?,
            time: parse_time(&request.time)?,
            city: request.city,
            venue: request.venue,
            venue_address: request.venue_address,
            created_by: request.created_by,
        };
        ctx.meetings.create(new, Local::now().date_naive()).await
    }
    .await;
    log_command_execution("meetings::create", start.elapsed(), result.is_ok());
    result
}

/// Fetch a meeting and its roster.
pub async fn get_meeting(ctx: &Arc<AppContext>, meeting_id: Uuid) -> Result<MeetingDetails> {
    let start = Instant::now();
    let result = async {
        let meeting = ctx.meetings.get(meeting_id).await?;
        let members = ctx.meetings.members(meeting_id).await?;
        Ok(MeetingDetails { meeting, members })
    }
    .await;
    log_command_execution("meetings::get", start.elapsed(), result.is_ok());
    result
}

/// Add a user to a meeting roster (idempotent, capacity-checked).
pub async fn add_member(
    ctx: &Arc<AppContext>,
    meeting_id: Uuid,
    user_id: UserId,
    display_name: Option<String>,
    added_by: Option<UserId>,
) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.add_member(meeting_id, user_id, display_name, added_by).await;
    log_command_execution("meetings::add_member", start.elapsed(), result.is_ok());
    result
}

/// Remove a user from a meeting roster (idempotent).
pub async fn remove_member(
    ctx: &Arc<AppContext>,
    meeting_id: Uuid,
    user_id: UserId,
) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.remove_member(meeting_id, user_id).await;
    log_command_execution("meetings::remove_member", start.elapsed(), result.is_ok());
    result
}

/// Move a meeting through its state machine.
pub async fn set_meeting_status(
    ctx: &Arc<AppContext>,
    meeting_id: Uuid,
    status: MeetingStatus,
) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.set_status(meeting_id, status).await;
    log_command_execution("meetings::set_status", start.elapsed(), result.is_ok());
    result
}

/// Cancel a meeting and notify its roster.
pub async fn cancel_meeting(ctx: &Arc<AppContext>, meeting_id: Uuid) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.cancel(meeting_id).await;
    log_command_execution("meetings::cancel", start.elapsed(), result.is_ok());
    result
}

/// Delete a meeting; its roster cascades and satisfied applications revert
/// to pending.
pub async fn delete_meeting(ctx: &Arc<AppContext>, meeting_id: Uuid) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.delete(meeting_id).await;
    log_command_execution("meetings::delete", start.elapsed(), result.is_ok());
    result
}

/// Link a meeting to the recurring slot its members applied for.
pub async fn link_meeting_slot(
    ctx: &Arc<AppContext>,
    meeting_id: Uuid,
    slot_id: Uuid,
) -> Result<()> {
    let start = Instant::now();
    let result = ctx.meetings.link_slot(meeting_id, slot_id).await;
    log_command_execution("meetings::link_slot", start.elapsed(), result.is_ok());
    result
}
